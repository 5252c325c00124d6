//! The authoritative "who is still racing" arena.
//!
//! Fixed capacity of [`MAX_PLAYERS`], occupancy tracked by explicit flags.
//! The session is the sole writer; everything else in the game reads through
//! session queries.

use tracing::warn;

use crate::{PlayerId, MAX_PLAYERS};

/// Active-player set for one match.
///
/// Invariant: `active_count` always equals the number of set flags, except
/// transiently on a client that just adopted a host-reported count after a
/// missed replication event (see [`Roster::adopt_authoritative_count`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    active: [bool; MAX_PLAYERS],
    player_count: u8,
    active_count: u8,
}

impl Roster {
    /// Creates a roster with the first `player_count` ids active.
    ///
    /// The caller validates the count; out-of-range values are clamped to the
    /// arena capacity so the type's indexing invariant holds regardless.
    #[must_use]
    pub fn new(player_count: u8) -> Self {
        let player_count = player_count.min(MAX_PLAYERS as u8);
        let mut active = [false; MAX_PLAYERS];
        for slot in active.iter_mut().take(player_count as usize) {
            *slot = true;
        }
        Self {
            active,
            player_count,
            active_count: player_count,
        }
    }

    /// Total participants this match, fixed for its duration.
    #[must_use]
    pub fn player_count(&self) -> u8 {
        self.player_count
    }

    /// Players still in play.
    #[must_use]
    pub fn active_count(&self) -> u8 {
        self.active_count
    }

    /// Whether the player has not been eliminated.
    #[must_use]
    pub fn is_active(&self, player: PlayerId) -> bool {
        self.active[player.index()]
    }

    /// Marks the player inactive. Returns `false` (and changes nothing) when
    /// the player was already out, which makes re-application of duplicated
    /// events a no-op.
    pub fn eliminate(&mut self, player: PlayerId) -> bool {
        if !self.active[player.index()] {
            return false;
        }
        self.active[player.index()] = false;
        self.active_count = self.active_count.saturating_sub(1);
        true
    }

    /// The last player standing, once only one flag remains set.
    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        if self.active_count != 1 {
            return None;
        }
        self.iter_active().next()
    }

    /// Iterates over active players in ascending id order.
    pub fn iter_active(&self) -> impl Iterator<Item = PlayerId> + '_ {
        PlayerId::all().filter(|p| self.active[p.index()])
    }

    /// Overwrites the stored count with the host's reported value.
    ///
    /// After a client applies a replicated batch the derived count normally
    /// matches; a mismatch means an earlier event expired before this client
    /// saw it. The ids it carried are gone, so the flags cannot be repaired;
    /// the count is taken on faith and the discrepancy logged.
    pub fn adopt_authoritative_count(&mut self, count: u8) {
        if count != self.active_count {
            warn!(
                local = self.active_count,
                host = count,
                "active count disagrees with host; adopting host value"
            );
        }
        self.active_count = count.min(self.player_count);
    }
}
