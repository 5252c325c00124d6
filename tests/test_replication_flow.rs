//! Host to client replication over a lossy, acknowledgement-free transport.

mod stubs;

use lap_knockout::replication::{codec, RETRANSMIT_FRAMES};
use lap_knockout::{
    EliminationRecord, KnockoutError, KnockoutEvent, MatchRole, SessionBuilder, SpectateCommand,
};
use stubs::{pid, NetStub, RaceStub};

fn host_and_client(players: u8, per_round: u8) -> (lap_knockout::KnockoutSession, lap_knockout::KnockoutSession) {
    let base = SessionBuilder::new()
        .with_player_count(players)
        .with_eliminations_per_round(per_round)
        .with_disconnect_grace(0);
    let host = base
        .clone()
        .with_role(MatchRole::Host)
        .start()
        .expect("valid configuration");
    let client = base
        .with_role(MatchRole::Client)
        .start()
        .expect("valid configuration");
    (host, client)
}

#[test]
fn host_decision_reaches_the_client_through_the_codec() {
    stubs::init_tracing();
    let (mut host, mut client) = host_and_client(4, 1);
    let host_net = NetStub::new(4, Some(0));
    let client_net = NetStub::new(4, Some(2));
    let mut race = RaceStub::new(4);
    race.order = vec![1, 2, 3, 0];
    race.complete_lap(&[1, 2, 3]);

    host.advance_tick(&race, &host_net, &[]);
    assert_eq!(host.active_count(), 3);

    let record = host.outgoing_record().expect("host produces records");
    assert!(!record.is_empty());
    let bytes = codec::encode(&record).expect("record encodes");
    let (received, _read): (EliminationRecord, usize) =
        codec::decode(&bytes).expect("record decodes");

    client.advance_tick(&race, &client_net, &[]);
    client.receive_record(&received, &race, &client_net);

    assert!(!client.is_active(pid(0)));
    assert_eq!(client.active_count(), host.active_count());
    assert_eq!(client.round(), host.round());
}

#[test]
fn retransmitted_records_apply_exactly_once() {
    let (mut host, mut client) = host_and_client(4, 1);
    let host_net = NetStub::new(4, Some(0));
    let client_net = NetStub::new(4, Some(2));
    let mut race = RaceStub::new(4);
    race.order = vec![1, 2, 3, 0];
    race.complete_lap(&[1, 2, 3]);
    host.advance_tick(&race, &host_net, &[]);
    let record = host.outgoing_record().expect("host produces records");

    client.receive_record(&record, &race, &client_net);
    let first_events: Vec<KnockoutEvent> = client.events().collect();
    assert!(!first_events.is_empty());

    // The host repeats the record every tick of the window; re-application
    // must not change anything or emit further events.
    for _ in 0..5 {
        client.receive_record(&record, &race, &client_net);
    }
    assert_eq!(client.active_count(), 3);
    assert_eq!(client.round(), 2);
    assert_eq!(client.events().len(), 0);
}

#[test]
fn client_adopts_host_count_after_a_missed_record() {
    let (mut host, mut client) = host_and_client(4, 1);
    let host_net = NetStub::new(4, Some(0));
    let client_net = NetStub::new(4, Some(1));
    let mut race = RaceStub::new(4);

    // Round 1 resolves; its record is lost in transit.
    race.order = vec![1, 2, 3, 0];
    race.complete_lap(&[1, 2, 3]);
    host.advance_tick(&race, &host_net, &[]);
    assert_eq!(host.active_count(), 3);

    // Round 2 resolves and this record arrives.
    race.order = vec![1, 2, 3];
    race.complete_lap(&[1, 2]);
    host.advance_tick(&race, &host_net, &[]);
    assert_eq!(host.active_count(), 2);
    let record = host.outgoing_record().expect("host produces records");

    client.receive_record(&record, &race, &client_net);

    // The round-2 victim is gone and the host's count is adopted wholesale;
    // the round-1 victim's flag stays stale because its ids are unrecoverable.
    assert!(!client.is_active(pid(3)));
    assert!(client.is_active(pid(0)));
    assert_eq!(client.active_count(), host.active_count());
    assert_eq!(client.round(), host.round());
}

#[test]
fn pending_record_expires_after_the_retransmission_window() {
    let (mut host, _client) = host_and_client(4, 1);
    let host_net = NetStub::new(4, Some(0));
    let mut race = RaceStub::new(4);
    race.order = vec![1, 2, 3, 0];
    race.complete_lap(&[1, 2, 3]);
    host.advance_tick(&race, &host_net, &[]);
    assert!(!host.outgoing_record().expect("host").is_empty());

    for _ in 0..RETRANSMIT_FRAMES {
        host.advance_tick(&race, &host_net, &[]);
    }
    assert!(host.outgoing_record().expect("host").is_empty());
}

#[test]
fn suppressed_disconnect_batch_leaves_the_round_open() {
    let (mut host, mut client) = host_and_client(6, 2);
    let mut host_net = NetStub::new(6, Some(0));
    let client_net = NetStub::new(6, Some(1));
    let race = RaceStub::new(6);

    host.advance_tick(&race, &host_net, &[]);
    host_net.drop_peer(5);
    host.advance_tick(&race, &host_net, &[]);
    assert!(!host.is_active(pid(5)));
    // One of round 1's two eliminations is still owed on the host.
    assert_eq!(host.round(), 1);
    assert_eq!(host.remaining_eliminations_this_round(), 1);

    let record = host.outgoing_record().expect("host produces records");
    assert!(record.suppress_round_advance);
    client.receive_record(&record, &race, &client_net);

    assert!(!client.is_active(pid(5)));
    assert_eq!(client.round(), 1);
    assert_eq!(client.remaining_eliminations_this_round(), 1);
    assert_eq!(client.active_count(), 5);
}

#[test]
fn client_never_resolves_rounds_locally() {
    let (_host, mut client) = host_and_client(4, 1);
    let client_net = NetStub::new(4, Some(1));
    let mut race = RaceStub::new(4);
    race.order = vec![1, 2, 3, 0];
    race.complete_lap(&[1, 2, 3]);

    client.advance_tick(&race, &client_net, &[]);

    // All the crossings are recorded, but no elimination happens without a
    // replicated decision.
    assert_eq!(client.active_count(), 4);
    assert_eq!(client.round(), 1);
    assert_eq!(client.outgoing_record(), Err(KnockoutError::NotHost));
}

#[test]
fn eliminated_client_player_spectates_and_cycles() {
    let (mut host, mut client) = host_and_client(4, 1);
    let host_net = NetStub::new(4, Some(0));
    // The client's local player is the round-1 victim.
    let client_net = NetStub::new(4, Some(0));
    let mut race = RaceStub::new(4);
    race.order = vec![1, 2, 3, 0];
    race.complete_lap(&[1, 2, 3]);
    host.advance_tick(&race, &host_net, &[]);
    let record = host.outgoing_record().expect("host produces records");

    client.receive_record(&record, &race, &client_net);
    assert!(client.is_spectating());
    assert_eq!(client.spectate_target(), Some(pid(1)));

    client.advance_tick(&race, &client_net, &[SpectateCommand::Retreat]);
    assert_eq!(client.spectate_target(), Some(pid(3)));
}

#[test]
fn hosts_ignore_received_records() {
    let (mut host, _client) = host_and_client(4, 1);
    let host_net = NetStub::new(4, Some(0));
    let race = RaceStub::new(4);

    let mut other = SessionBuilder::new()
        .with_player_count(4)
        .with_role(MatchRole::Host)
        .start()
        .expect("valid configuration");
    let mut forged_race = RaceStub::new(4);
    forged_race.order = vec![1, 2, 3, 0];
    forged_race.complete_lap(&[1, 2, 3]);
    other.advance_tick(&forged_race, &host_net, &[]);
    let record = other.outgoing_record().expect("host produces records");

    host.receive_record(&record, &race, &host_net);
    assert_eq!(host.active_count(), 4);
    assert_eq!(host.round(), 1);
}
