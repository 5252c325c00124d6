//! Pure computation of the per-round elimination schedule.
//!
//! The plan is built exactly once when a match starts and never mutated
//! afterwards; every other component treats it as read-only configuration.

use smallvec::SmallVec;

use crate::MAX_ROUNDS;

/// The ordered per-round elimination schedule for one match.
///
/// Entry `n` is the number of players removed in round `n + 1`. The plan is a
/// pure function of its inputs (player count, configured rate, track lap
/// count) with no randomness, so host and clients that agree on the
/// inputs agree on the plan.
///
/// # Examples
///
/// ```
/// use lap_knockout::EliminationPlan;
///
/// // 8 players, one knockout per round on a 3-lap track: 7 rounds of 1.
/// let plan = EliminationPlan::build(8, 1, 3);
/// assert_eq!(plan.rounds(), &[1, 1, 1, 1, 1, 1, 1]);
///
/// // A single-lap track is winner-takes-all on the first finisher.
/// let plan = EliminationPlan::build(8, 1, 1);
/// assert_eq!(plan.rounds(), &[7]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EliminationPlan {
    rounds: SmallVec<[u8; MAX_ROUNDS]>,
}

impl EliminationPlan {
    /// Builds the schedule.
    ///
    /// Rules, in order:
    /// - fewer than 2 players: empty plan (nothing to decide).
    /// - exactly one lap: a single round eliminating everyone but the first
    ///   finisher.
    /// - a configured rate of 0 is treated as 1.
    /// - exactly two laps with at least 3 players: the rate is doubled for
    ///   this match (saturating at 255), because two-lap tracks otherwise
    ///   resolve too slowly.
    /// - otherwise, subtract the rate from the remaining player count round by
    ///   round, clamping each round so at least one player survives, until a
    ///   single player remains or [`MAX_ROUNDS`] is reached.
    #[must_use]
    pub fn build(player_count: u8, per_round: u8, track_laps: u8) -> Self {
        let mut rounds = SmallVec::new();
        if player_count < 2 {
            return Self { rounds };
        }

        if track_laps <= 1 {
            rounds.push(player_count - 1);
            return Self { rounds };
        }

        let mut rate = if per_round == 0 { 1 } else { per_round };
        if track_laps == 2 && player_count >= 3 {
            rate = rate.saturating_mul(2);
        }

        let mut remaining = player_count;
        while remaining > 1 && rounds.len() < MAX_ROUNDS {
            let quota = rate.min(remaining - 1).max(1);
            rounds.push(quota);
            remaining -= quota;
        }
        Self { rounds }
    }

    /// The per-round quotas, first round first.
    #[must_use]
    pub fn rounds(&self) -> &[u8] {
        &self.rounds
    }

    /// Total number of rounds in the match.
    #[must_use]
    pub fn round_count(&self) -> u8 {
        self.rounds.len() as u8
    }

    /// The planned elimination count for a 1-based round number, or 0 when the
    /// round is past the end of the plan.
    #[must_use]
    pub fn quota_for_round(&self, round: u8) -> u8 {
        let idx = round.saturating_sub(1) as usize;
        self.rounds.get(idx).copied().unwrap_or(0)
    }

    /// Sum of all per-round quotas.
    #[must_use]
    pub fn total_eliminations(&self) -> u8 {
        self.rounds.iter().sum()
    }
}
