//! End-to-end match progression driven through the public tick API.

mod stubs;

use lap_knockout::{
    EliminationCause, KnockoutEvent, MatchOutcome, MatchRole, SessionBuilder, SpectateCommand,
};
use stubs::{pid, NetStub, RaceStub};

#[test]
fn eight_player_match_runs_to_a_winner() {
    stubs::init_tracing();
    let mut session = SessionBuilder::new()
        .with_player_count(8)
        .with_eliminations_per_round(2)
        .with_track_laps(Some(3))
        .with_role(MatchRole::Host)
        .with_disconnect_grace(0)
        .start()
        .expect("valid configuration");
    assert_eq!(session.plan().rounds(), &[2, 2, 2, 1]);

    let net = NetStub::new(8, Some(0));
    let mut race = RaceStub::new(8);
    let mut events = Vec::new();

    // Each round, everyone except the doomed tail completes a lap.
    let mut iterations = 0;
    while !session.is_concluded() {
        iterations += 1;
        assert!(iterations <= 8, "match failed to converge");

        let active: Vec<u8> = (0..8).filter(|&p| session.is_active(pid(p))).collect();
        race.order = active.clone();
        let safe = active.len() - session.remaining_eliminations_this_round() as usize;
        race.complete_lap(&active[..safe]);
        session.advance_tick(&race, &net, &[]);
        events.extend(session.events());
    }

    assert_eq!(iterations, 4);
    assert_eq!(session.active_count(), 1);
    assert_eq!(session.winner(), Some(pid(0)));

    let eliminated = events
        .iter()
        .filter(|e| matches!(e, KnockoutEvent::PlayerEliminated { .. }))
        .count();
    let advanced = events
        .iter()
        .filter(|e| matches!(e, KnockoutEvent::RoundAdvanced { .. }))
        .count();
    assert_eq!(eliminated, 7);
    assert_eq!(advanced, 3);
    assert_eq!(
        events.last(),
        Some(&KnockoutEvent::MatchConcluded {
            outcome: MatchOutcome::Winner(pid(0)),
        })
    );
}

#[test]
fn round_events_arrive_in_application_order() {
    let mut session = SessionBuilder::new()
        .with_player_count(4)
        .with_role(MatchRole::Host)
        .with_disconnect_grace(0)
        .start()
        .expect("valid configuration");
    let net = NetStub::new(4, Some(0));
    let mut race = RaceStub::new(4);
    race.order = vec![1, 2, 3, 0];
    race.complete_lap(&[1, 2, 3]);
    session.advance_tick(&race, &net, &[]);

    let events: Vec<KnockoutEvent> = session.events().collect();
    assert_eq!(
        events,
        vec![
            KnockoutEvent::PlayerEliminated {
                player: pid(0),
                round: 1,
                cause: EliminationCause::RoundLoss,
            },
            KnockoutEvent::RoundAdvanced {
                round: 2,
                active: 3,
            },
        ]
    );
}

#[test]
fn host_local_elimination_switches_to_spectating() {
    let mut session = SessionBuilder::new()
        .with_player_count(4)
        .with_role(MatchRole::Host)
        .with_disconnect_grace(0)
        .start()
        .expect("valid configuration");
    // The host's own player (0) is in last place.
    let net = NetStub::new(4, Some(0));
    let mut race = RaceStub::new(4);
    race.order = vec![1, 2, 3, 0];
    race.complete_lap(&[1, 2, 3]);
    session.advance_tick(&race, &net, &[]);

    assert!(!session.is_active(pid(0)));
    assert!(!session.is_concluded());
    assert!(session.is_spectating());
    assert_eq!(session.spectate_target(), Some(pid(1)));

    // Manual cycling moves off the leader and sticks.
    session.advance_tick(&race, &net, &[SpectateCommand::Advance]);
    assert_eq!(session.spectate_target(), Some(pid(2)));
    session.advance_tick(&race, &net, &[]);
    assert_eq!(session.spectate_target(), Some(pid(2)));
}

#[test]
fn host_disconnect_detection_eliminates_the_dropped_players() {
    let mut session = SessionBuilder::new()
        .with_player_count(4)
        .with_role(MatchRole::Host)
        .with_disconnect_grace(0)
        .start()
        .expect("valid configuration");
    let mut net = NetStub::new(4, Some(0));
    let race = RaceStub::new(4);

    // First sample establishes the baseline.
    session.advance_tick(&race, &net, &[]);
    assert_eq!(session.active_count(), 4);

    net.drop_peer(3);
    session.advance_tick(&race, &net, &[]);

    assert!(!session.is_active(pid(3)));
    assert_eq!(session.active_count(), 3);
    let events: Vec<KnockoutEvent> = session.events().collect();
    assert!(events.contains(&KnockoutEvent::PlayerEliminated {
        player: pid(3),
        round: 1,
        cause: EliminationCause::Disconnect,
    }));
    // The disconnect consumed round 1's only elimination.
    assert_eq!(session.round(), 2);
}

#[test]
fn grace_window_defers_disconnect_detection() {
    let mut session = SessionBuilder::new()
        .with_player_count(4)
        .with_role(MatchRole::Host)
        .with_disconnect_grace(5)
        .start()
        .expect("valid configuration");
    let mut net = NetStub::new(4, Some(0));
    let race = RaceStub::new(4);

    session.advance_tick(&race, &net, &[]);
    net.drop_peer(3);
    // The drop happens inside the grace window: never reported.
    for _ in 0..10 {
        session.advance_tick(&race, &net, &[]);
    }
    assert!(session.is_active(pid(3)));

    net.drop_peer(2);
    session.advance_tick(&race, &net, &[]);
    assert!(!session.is_active(pid(2)));
    assert!(session.is_active(pid(3)));
}

#[test]
fn reset_match_supports_a_rematch() {
    let mut session = SessionBuilder::new()
        .with_player_count(4)
        .with_role(MatchRole::Host)
        .with_disconnect_grace(0)
        .start()
        .expect("valid configuration");
    let net = NetStub::new(4, Some(0));
    let mut race = RaceStub::new(4);
    race.order = vec![1, 2, 3, 0];
    race.complete_lap(&[1, 2, 3]);
    session.advance_tick(&race, &net, &[]);
    assert_eq!(session.active_count(), 3);

    session.reset_match();
    assert_eq!(session.active_count(), 4);
    assert_eq!(session.round(), 1);
    assert!(session.is_active(pid(0)));
    assert!(!session.is_spectating());

    // The same crossings resolve round 1 again after the reset.
    let mut race = RaceStub::new(4);
    race.order = vec![0, 1, 2, 3];
    race.complete_lap(&[0, 1, 2]);
    session.advance_tick(&race, &net, &[]);
    assert!(!session.is_active(pid(3)));
    assert_eq!(session.round(), 2);
}
