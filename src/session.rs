//! The match manager: owns the roster, drives rounds, applies eliminations
//! and replicates host decisions.

use std::collections::VecDeque;

use smallvec::SmallVec;
use tracing::{debug, info, trace};

use crate::disconnect::DisconnectMonitor;
use crate::events::{EventDrain, KnockoutEvent, MatchOutcome};
use crate::planner::EliminationPlan;
use crate::replication::{EliminationRecord, Inbox, Outbox};
use crate::roster::Roster;
use crate::round::RoundTracker;
use crate::spectator::{SpectateCommand, SpectatorController};
use crate::{
    EliminationCause, KnockoutError, MatchRole, PlayerId, RaceView, SessionView, MAX_PLAYERS,
};

/// How long a freshly-recorded elimination stays in the recent-eliminations
/// query (~3 seconds at 60 fps), for on-screen display.
pub const ELIMINATION_DISPLAY_FRAMES: u16 = 180;

/// Capacity of the recent-eliminations ring.
const RECENT_ELIMINATIONS: usize = 4;

/// On-screen ring of the latest eliminations, oldest evicted first, cleared
/// when the display countdown lapses or a new round starts falling.
#[derive(Debug, Clone, Default)]
struct EliminationTicker {
    recent: SmallVec<[PlayerId; RECENT_ELIMINATIONS]>,
    round: u8,
    frames_left: u16,
}

impl EliminationTicker {
    fn record(&mut self, player: PlayerId, round: u8) {
        if self.frames_left == 0 || self.round != round {
            self.recent.clear();
            self.round = round;
        }
        if self.recent.len() == RECENT_ELIMINATIONS {
            self.recent.remove(0);
        }
        self.recent.push(player);
        self.frames_left = ELIMINATION_DISPLAY_FRAMES;
    }

    fn tick(&mut self) {
        if self.frames_left == 0 {
            return;
        }
        self.frames_left -= 1;
        if self.frames_left == 0 {
            self.recent.clear();
            self.round = 0;
        }
    }

    fn clear(&mut self) {
        self.recent.clear();
        self.round = 0;
        self.frames_left = 0;
    }
}

/// One match of lap-based knockout racing.
///
/// The session is the exclusive owner and sole writer of the active-player
/// set; everything else reads it through queries. It is single-threaded and
/// tick-driven: call [`advance_tick`](Self::advance_tick) once per simulation
/// step, move one [`EliminationRecord`] per tick in each direction through
/// [`outgoing_record`](Self::outgoing_record) /
/// [`receive_record`](Self::receive_record), and drain
/// [`events`](Self::events) for side effects to enact in the game.
///
/// Construct via [`SessionBuilder`](crate::SessionBuilder).
#[derive(Debug)]
pub struct KnockoutSession {
    role: MatchRole,
    track_laps: u8,
    per_round: u8,
    plan: EliminationPlan,
    roster: Roster,
    tracker: RoundTracker,
    outbox: Outbox,
    inbox: Inbox,
    monitor: DisconnectMonitor,
    spectator: SpectatorController,
    ticker: EliminationTicker,
    last_lap: [u16; MAX_PLAYERS],
    events: VecDeque<KnockoutEvent>,
    grace_frames: u16,
    concluded: bool,
    winner: Option<PlayerId>,
}

impl KnockoutSession {
    pub(crate) fn new(
        player_count: u8,
        per_round: u8,
        track_laps: u8,
        role: MatchRole,
        grace_frames: u16,
    ) -> Self {
        let plan = EliminationPlan::build(player_count, per_round, track_laps);
        info!(
            player_count,
            per_round,
            track_laps,
            ?role,
            rounds = plan.round_count(),
            "match started"
        );
        Self {
            role,
            track_laps,
            per_round,
            plan,
            roster: Roster::new(player_count),
            tracker: RoundTracker::new(),
            outbox: Outbox::new(),
            inbox: Inbox::new(),
            monitor: DisconnectMonitor::with_grace(grace_frames),
            spectator: SpectatorController::new(),
            ticker: EliminationTicker::default(),
            last_lap: [0; MAX_PLAYERS],
            events: VecDeque::new(),
            grace_frames,
            concluded: false,
            winner: None,
        }
    }

    // ===============
    // Tick driving
    // ===============

    /// Drives one simulation tick.
    ///
    /// In order: counts down the display ticker, samples connectivity for
    /// disconnects (host), folds observed lap progress into the round
    /// tracker (resolving the round when it can), services the spectator
    /// view, and counts down the replication retransmission window.
    ///
    /// `commands` are any manual spectate-cycle inputs that fired this tick;
    /// they are ignored unless a local view is spectating.
    pub fn advance_tick(
        &mut self,
        race: &impl RaceView,
        net: &impl SessionView,
        commands: &[SpectateCommand],
    ) {
        self.ticker.tick();

        // A concluded match only lingers to finish retransmitting.
        if self.concluded && !self.outbox.has_pending() {
            return;
        }

        if self.role == MatchRole::Host {
            let lost = self.monitor.sample(net.reachable_peers());
            if !lost.is_empty() {
                let dropped: SmallVec<[PlayerId; MAX_PLAYERS]> = self
                    .roster
                    .iter_active()
                    .filter(|&p| net.peer_of(p).is_some_and(|peer| lost.contains(peer)))
                    .collect();
                for player in dropped {
                    debug!(%player, "eliminating disconnected player");
                    self.apply_elimination(
                        player,
                        EliminationCause::Disconnect,
                        false,
                        true,
                        true,
                        race,
                        net,
                    );
                }
            }
        }

        self.observe_lap_progress(race, net);

        if self.spectator.is_spectating() {
            for &command in commands {
                if let Some(target) = self.spectator.apply_command(command, &self.roster, race) {
                    self.events
                        .push_back(KnockoutEvent::SpectateTargetChanged { target });
                }
            }
            if let Some(target) = self.spectator.maintain(&self.roster, race) {
                self.events
                    .push_back(KnockoutEvent::SpectateTargetChanged { target });
            }
        }

        if self.role == MatchRole::Host {
            self.outbox.tick();
        }
    }

    fn observe_lap_progress(&mut self, race: &impl RaceView, net: &impl SessionView) {
        for player in PlayerId::all().take(self.roster.player_count() as usize) {
            let lap = race.current_lap(player);
            if lap > self.last_lap[player.index()] {
                self.last_lap[player.index()] = lap;
                self.on_lap_crossing(player, lap, race, net);
            }
        }
    }

    /// Records a lap-threshold crossing for the current round. A player is
    /// past the threshold once the lap they are on exceeds the round number.
    fn on_lap_crossing(
        &mut self,
        player: PlayerId,
        lap: u16,
        race: &impl RaceView,
        net: &impl SessionView,
    ) {
        if self.concluded || !self.roster.is_active(player) {
            return;
        }
        if lap <= u16::from(self.tracker.round()) {
            return;
        }
        if !self.tracker.record_crossing(player) {
            return;
        }
        trace!(%player, round = self.tracker.round(), "crossing recorded");
        // Clients record crossings for bookkeeping but never resolve; they
        // wait for the host's replicated decision.
        if self.role.decides_locally() {
            self.try_resolve_round(race, net);
        }
    }

    // ===============
    // Hooks
    // ===============

    /// Feeds a "player finished the race" notification. Finishing counts as
    /// crossing the current round's threshold.
    pub fn player_finished(
        &mut self,
        player: PlayerId,
        race: &impl RaceView,
        net: &impl SessionView,
    ) -> Result<(), KnockoutError> {
        if player.as_u8() >= self.roster.player_count() {
            return Err(KnockoutError::UnknownPlayer { player });
        }
        if self.concluded {
            return Err(KnockoutError::MatchConcluded);
        }
        if !self.roster.is_active(player) {
            return Ok(());
        }
        if self.tracker.record_crossing(player) && self.role.decides_locally() {
            self.try_resolve_round(race, net);
        }
        Ok(())
    }

    /// Feeds a known disconnect directly, bypassing the crossing-based
    /// trigger. No-op on clients: they learn about the elimination from the
    /// host like everyone else.
    pub fn player_disconnected(
        &mut self,
        player: PlayerId,
        race: &impl RaceView,
        net: &impl SessionView,
    ) -> Result<(), KnockoutError> {
        if player.as_u8() >= self.roster.player_count() {
            return Err(KnockoutError::UnknownPlayer { player });
        }
        if self.concluded {
            return Err(KnockoutError::MatchConcluded);
        }
        if self.role.decides_locally() {
            self.apply_elimination(
                player,
                EliminationCause::Disconnect,
                false,
                true,
                true,
                race,
                net,
            );
        }
        Ok(())
    }

    // ===============
    // Round resolution
    // ===============

    /// Planned eliminations for the current round, clamped so at least one
    /// player survives. 0 once the match cannot eliminate anyone.
    fn base_quota(&self) -> u8 {
        let active = self.roster.active_count();
        if active <= 1 {
            return 0;
        }
        if self.track_laps <= 1 {
            return active - 1;
        }
        let planned = self.plan.quota_for_round(self.tracker.round());
        if planned == 0 {
            0
        } else {
            planned.min(active - 1)
        }
    }

    /// The round's quota minus eliminations already spent on disconnects,
    /// floored at zero and re-clamped against the survivor rule.
    fn remaining_quota(&self) -> u8 {
        let base = self.base_quota();
        if base == 0 || self.track_laps <= 1 {
            return base;
        }
        let debits = self.tracker.disconnect_debits();
        if debits >= base {
            return 0;
        }
        let remaining = base - debits;
        let active = self.roster.active_count();
        if remaining >= active {
            active.saturating_sub(1)
        } else {
            remaining
        }
    }

    fn try_resolve_round(&mut self, race: &impl RaceView, net: &impl SessionView) {
        if self.concluded || self.roster.active_count() <= 1 {
            return;
        }
        let quota = self.remaining_quota();
        if quota == 0 {
            // The round's eliminations were entirely absorbed by disconnects;
            // keep accruing crossings until the round rolls over.
            return;
        }

        // On a single-lap track the first crossing alone resolves the match;
        // otherwise only the doomed players may remain un-crossed.
        let required = if self.track_laps <= 1 {
            1
        } else {
            self.roster.active_count() - quota
        };
        if self.tracker.crossings() < required {
            return;
        }

        let candidates = self.tracker.select_candidates(&self.roster, race, quota);
        if candidates.is_empty() {
            return;
        }
        let concluded_round = self.tracker.round();
        debug!(
            round = concluded_round,
            count = candidates.len(),
            "round resolved"
        );

        for (i, &player) in candidates.iter().enumerate() {
            let last = i == candidates.len() - 1;
            self.apply_elimination(
                player,
                EliminationCause::RoundLoss,
                false,
                !last,
                false,
                race,
                net,
            );
        }
        if self.role == MatchRole::Host {
            self.outbox.publish(
                &candidates,
                concluded_round,
                self.roster.active_count(),
                false,
            );
        }
    }

    /// The single mutation path every elimination goes through, local or
    /// replicated. Safe to call with already-eliminated players (no-op), which
    /// is what makes re-applied events harmless.
    #[allow(clippy::too_many_arguments)]
    fn apply_elimination(
        &mut self,
        player: PlayerId,
        cause: EliminationCause,
        from_network: bool,
        suppress_round_advance: bool,
        publish_single: bool,
        race: &impl RaceView,
        net: &impl SessionView,
    ) {
        if self.concluded || !self.roster.is_active(player) {
            return;
        }
        let concluded_round = self.tracker.round();
        let multi_lap = self.track_laps > 1;

        self.roster.eliminate(player);

        let mut suppress = suppress_round_advance;
        if cause == EliminationCause::Disconnect {
            if multi_lap {
                self.tracker.add_disconnect_debit();
                // The round still advances normally only when the disconnect
                // consumed its final owed elimination.
                suppress = self.remaining_quota() > 0;
            } else {
                suppress = self.roster.active_count() > 1;
            }
        }

        if self.role == MatchRole::Host && !from_network && publish_single {
            self.outbox.publish(
                &[player],
                concluded_round,
                self.roster.active_count(),
                suppress,
            );
        }

        self.ticker.record(player, concluded_round);
        info!(%player, round = concluded_round, %cause, "player eliminated");
        self.events.push_back(KnockoutEvent::PlayerEliminated {
            player,
            round: concluded_round,
            cause,
        });

        if net.is_local(player) {
            if self.role.is_online() {
                if let Some(target) = self.spectator.enter(&self.roster, race) {
                    self.events
                        .push_back(KnockoutEvent::SpectateTargetChanged { target });
                }
            } else {
                // Offline there is no spectating: the whole match ends now,
                // locked in at current standings.
                self.conclude(MatchOutcome::FinalizedAtStandings);
                return;
            }
        }

        if !suppress {
            self.tracker.reset_round();
        }

        if self.roster.active_count() <= 1 {
            let outcome = match self.roster.winner() {
                Some(winner) if self.role.is_online() => MatchOutcome::Winner(winner),
                _ => MatchOutcome::FinalizedAtStandings,
            };
            self.winner = self.roster.winner();
            self.conclude(outcome);
            return;
        }

        if !suppress {
            self.tracker.advance_round();
            self.events.push_back(KnockoutEvent::RoundAdvanced {
                round: self.tracker.round(),
                active: self.roster.active_count(),
            });
        }
    }

    fn conclude(&mut self, outcome: MatchOutcome) {
        if self.concluded {
            return;
        }
        self.concluded = true;
        if let MatchOutcome::Winner(winner) = outcome {
            self.winner = Some(winner);
        }
        info!(?outcome, "match concluded");
        self.events
            .push_back(KnockoutEvent::MatchConcluded { outcome });
    }

    // ===============
    // Replication plumbing
    // ===============

    /// The record to embed in this tick's outgoing packets. Errors with
    /// [`KnockoutError::NotHost`] for clients and offline sessions, which
    /// never produce records.
    pub fn outgoing_record(&self) -> Result<EliminationRecord, KnockoutError> {
        if self.role != MatchRole::Host {
            return Err(KnockoutError::NotHost);
        }
        Ok(self.outbox.record_for_tick())
    }

    /// Feeds a record received from the host. Duplicates, stale sequences and
    /// malformed ids are ignored silently; a new record is applied exactly
    /// once and the host's round and active count are adopted as ground
    /// truth. Host and offline sessions ignore all records.
    pub fn receive_record(
        &mut self,
        record: &EliminationRecord,
        race: &impl RaceView,
        net: &impl SessionView,
    ) {
        if self.role != MatchRole::Client {
            return;
        }
        let Some(batch) = self.inbox.accept(record) else {
            return;
        };
        debug!(
            round = batch.round,
            count = batch.players.len(),
            "applying replicated batch"
        );

        self.tracker.set_round(batch.round);
        let cause = if batch.suppress_round_advance {
            EliminationCause::Disconnect
        } else {
            EliminationCause::RoundLoss
        };
        let total = batch.players.len();
        for (i, &player) in batch.players.iter().enumerate() {
            let last = i == total - 1;
            let suppress = batch.suppress_round_advance || !last;
            self.apply_elimination(player, cause, true, suppress, false, race, net);
        }
        self.roster.adopt_authoritative_count(batch.active_count);
    }

    // ===============
    // Lifecycle
    // ===============

    /// Atomically discards all round, replication, spectator and display
    /// state and restarts the same match configuration from round 1. This is
    /// the explicit rematch signal.
    pub fn reset_match(&mut self) {
        info!("match reset");
        self.roster = Roster::new(self.roster.player_count());
        self.tracker = RoundTracker::new();
        self.outbox.clear();
        self.inbox.clear();
        self.monitor = DisconnectMonitor::with_grace(self.grace_frames);
        self.spectator.reset();
        self.ticker.clear();
        self.last_lap = [0; MAX_PLAYERS];
        self.events.clear();
        self.concluded = false;
        self.winner = None;
    }

    // ===============
    // Queries
    // ===============

    /// Drains pending notifications, oldest first.
    pub fn events(&mut self) -> EventDrain<'_> {
        EventDrain::from_drain(self.events.drain(..))
    }

    /// The authority role this session plays.
    #[must_use]
    pub fn role(&self) -> MatchRole {
        self.role
    }

    /// The current 1-based round number.
    #[must_use]
    pub fn round(&self) -> u8 {
        self.tracker.round()
    }

    /// Players still in play.
    #[must_use]
    pub fn active_count(&self) -> u8 {
        self.roster.active_count()
    }

    /// Total participants this match.
    #[must_use]
    pub fn player_count(&self) -> u8 {
        self.roster.player_count()
    }

    /// Whether the player has not been eliminated.
    #[must_use]
    pub fn is_active(&self, player: PlayerId) -> bool {
        self.roster.is_active(player)
    }

    /// Whether the match has reached its terminal state.
    #[must_use]
    pub fn is_concluded(&self) -> bool {
        self.concluded
    }

    /// The winner, once the match concluded with one.
    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    /// The elimination schedule computed at match start.
    #[must_use]
    pub fn plan(&self) -> &EliminationPlan {
        &self.plan
    }

    /// The configured elimination rate this match was built with.
    #[must_use]
    pub fn eliminations_per_round(&self) -> u8 {
        self.per_round.max(1)
    }

    /// Eliminations still owed in the current round, for HUD display.
    #[must_use]
    pub fn remaining_eliminations_this_round(&self) -> u8 {
        self.remaining_quota()
    }

    /// The latest eliminations (up to 4, oldest first) while their display
    /// countdown runs; empty afterwards.
    #[must_use]
    pub fn recent_eliminations(&self) -> &[PlayerId] {
        &self.ticker.recent
    }

    /// Frames left on the recent-eliminations display countdown.
    #[must_use]
    pub fn elimination_display_frames_left(&self) -> u16 {
        self.ticker.frames_left
    }

    /// Whether a local view is spectating.
    #[must_use]
    pub fn is_spectating(&self) -> bool {
        self.spectator.is_spectating()
    }

    /// The player the spectating camera follows.
    #[must_use]
    pub fn spectate_target(&self) -> Option<PlayerId> {
        self.spectator.target()
    }
}
