//! Per-round crossing bookkeeping and elimination candidate selection.

use smallvec::SmallVec;

use crate::roster::Roster;
use crate::{PlayerId, RaceView, MAX_PLAYERS};

/// Tracks which players have crossed the lap threshold for the current round,
/// in arrival order, plus the round's disconnect debits.
///
/// All of this state is round-local: [`RoundTracker::reset_round`] wipes it
/// whenever a round concludes, and [`RoundTracker::advance_round`] moves the
/// 1-based round counter forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTracker {
    round: u8,
    crossed: [bool; MAX_PLAYERS],
    cross_order: SmallVec<[PlayerId; MAX_PLAYERS]>,
    disconnect_debits: u8,
}

impl Default for RoundTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundTracker {
    /// Creates a tracker positioned at round 1 with no crossings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            round: 1,
            crossed: [false; MAX_PLAYERS],
            cross_order: SmallVec::new(),
            disconnect_debits: 0,
        }
    }

    /// The current 1-based round number. Monotonically non-decreasing until a
    /// full match reset.
    #[must_use]
    pub fn round(&self) -> u8 {
        self.round
    }

    /// How many players have crossed this round.
    #[must_use]
    pub fn crossings(&self) -> u8 {
        self.cross_order.len() as u8
    }

    /// Whether the player already crossed this round.
    #[must_use]
    pub fn has_crossed(&self, player: PlayerId) -> bool {
        self.crossed[player.index()]
    }

    /// Eliminations already spent on disconnects this round.
    #[must_use]
    pub fn disconnect_debits(&self) -> u8 {
        self.disconnect_debits
    }

    /// Records one disconnect-driven elimination against this round's quota.
    pub fn add_disconnect_debit(&mut self) {
        self.disconnect_debits = self.disconnect_debits.saturating_add(1);
    }

    /// Records a crossing. Returns `false` when the player had already
    /// crossed this round (duplicates are ignored).
    pub fn record_crossing(&mut self, player: PlayerId) -> bool {
        if self.crossed[player.index()] {
            return false;
        }
        self.crossed[player.index()] = true;
        self.cross_order.push(player);
        true
    }

    /// Clears crossings and debits for a fresh round without advancing the
    /// counter. Called both on normal round conclusion and when the host's
    /// replicated round number is adopted.
    pub fn reset_round(&mut self) {
        self.crossed = [false; MAX_PLAYERS];
        self.cross_order.clear();
        self.disconnect_debits = 0;
    }

    /// Moves to the next round.
    pub fn advance_round(&mut self) {
        self.round = self.round.saturating_add(1);
    }

    /// Adopts a replicated round number as ground truth.
    pub fn set_round(&mut self, round: u8) {
        self.round = round.max(1);
    }

    /// Picks the players to eliminate when the round resolves, worst placed
    /// first.
    ///
    /// Primary key: live standings, walked from last place upward, skipping
    /// players that are inactive or already safe (crossed). When standings are
    /// unavailable the active un-crossed players are taken in ascending id
    /// order instead. Either way, any shortfall is filled from the crossing
    /// log in reverse arrival order (last to cross goes first).
    ///
    /// The host runs this once and ships the resulting list; clients never
    /// re-derive it, so the ordering only has to be deterministic on a single
    /// machine.
    #[must_use]
    pub fn select_candidates(
        &self,
        roster: &Roster,
        race: &impl RaceView,
        quota: u8,
    ) -> SmallVec<[PlayerId; MAX_PLAYERS]> {
        let mut picked: SmallVec<[PlayerId; MAX_PLAYERS]> = SmallVec::new();
        if quota == 0 {
            return picked;
        }

        if race.has_standings() {
            for position in (0..MAX_PLAYERS).rev() {
                if picked.len() >= quota as usize {
                    break;
                }
                let Some(player) = race.player_in_position(position) else {
                    continue;
                };
                if !roster.is_active(player) || self.has_crossed(player) {
                    continue;
                }
                if !picked.contains(&player) {
                    picked.push(player);
                }
            }
        } else {
            for player in roster.iter_active() {
                if picked.len() >= quota as usize {
                    break;
                }
                if !self.has_crossed(player) {
                    picked.push(player);
                }
            }
        }

        for &player in self.cross_order.iter().rev() {
            if picked.len() >= quota as usize {
                break;
            }
            if roster.is_active(player) && !picked.contains(&player) {
                picked.push(player);
            }
        }

        picked
    }
}
