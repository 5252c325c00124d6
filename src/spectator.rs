//! Camera-target selection for eliminated local players.
//!
//! Once a local participant is knocked out of an online match, their view
//! switches to spectating. The default policy follows the current race leader
//! among still-active players; a manual command picks a specific target and
//! suspends leader-following until that target is itself eliminated, at which
//! point the controller falls to the nearest next active player in the cycle
//! order.

use smallvec::SmallVec;
use tracing::trace;

use crate::roster::Roster;
use crate::{PlayerId, RaceView, MAX_PLAYERS};

/// A manual spectator camera command.
///
/// This is the capability interface the embedding game resolves its own
/// controller taxonomy down to; which physical button maps to which command
/// on which device family is not this crate's concern.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SpectateCommand {
    /// Cycle the camera target forward through the active-player order.
    Advance,
    /// Cycle the camera target backward.
    Retreat,
}

/// Per-local-view spectator state machine.
#[derive(Debug, Clone, Default)]
pub struct SpectatorController {
    spectating: bool,
    target: Option<PlayerId>,
    manual: bool,
}

impl SpectatorController {
    /// Creates a controller that is not spectating.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the local view is currently spectating.
    #[must_use]
    pub fn is_spectating(&self) -> bool {
        self.spectating
    }

    /// The player the camera currently follows.
    #[must_use]
    pub fn target(&self) -> Option<PlayerId> {
        self.target
    }

    /// Whether the viewer manually picked the current target.
    #[must_use]
    pub fn is_manual(&self) -> bool {
        self.manual
    }

    /// Leaves spectator mode and forgets the target (match reset).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Enters spectator mode, defaulting to the race leader. Returns the
    /// initial camera target, if any active player exists to follow.
    pub fn enter(&mut self, roster: &Roster, race: &impl RaceView) -> Option<PlayerId> {
        self.spectating = true;
        self.manual = false;
        self.target = leader(roster, race)
            .or_else(|| cycle_from(roster, race, None, true));
        trace!(target = ?self.target, "entered spectator mode");
        self.target
    }

    /// Applies a manual cycle command. Returns the new target when it
    /// changed. Ignored while not spectating.
    pub fn apply_command(
        &mut self,
        command: SpectateCommand,
        roster: &Roster,
        race: &impl RaceView,
    ) -> Option<PlayerId> {
        if !self.spectating {
            return None;
        }
        let forward = matches!(command, SpectateCommand::Advance);
        let next = cycle_from(roster, race, self.target, forward)?;
        if Some(next) == self.target {
            return None;
        }
        self.target = Some(next);
        self.manual = true;
        trace!(target = %next, "manual spectate target");
        Some(next)
    }

    /// Per-tick upkeep: follow the leader unless a manual target is set, and
    /// fall back to the next active player when the target has been
    /// eliminated. Returns the new target when it changed.
    pub fn maintain(&mut self, roster: &Roster, race: &impl RaceView) -> Option<PlayerId> {
        if !self.spectating {
            return None;
        }
        let previous = self.target;

        if !self.manual {
            if let Some(lead) = leader(roster, race) {
                self.target = Some(lead);
            }
        }

        // A dead target is replaced by the nearest next active player; if
        // nobody is left to follow, manual override lapses too.
        if let Some(current) = self.target {
            if !roster.is_active(current) {
                self.target = cycle_from(roster, race, Some(current), true);
                if self.target.is_none() {
                    self.manual = false;
                }
            }
        }

        if self.target == previous {
            None
        } else {
            self.target
        }
    }
}

/// The best-placed active player, or `None` without standings.
fn leader(roster: &Roster, race: &impl RaceView) -> Option<PlayerId> {
    if !race.has_standings() {
        return None;
    }
    (0..MAX_PLAYERS)
        .filter_map(|pos| race.player_in_position(pos))
        .find(|&p| roster.is_active(p))
}

/// The stable cycle order: standings order first (deduplicated), then any
/// active players the standings missed, in ascending id order.
fn spectate_order(roster: &Roster, race: &impl RaceView) -> SmallVec<[PlayerId; MAX_PLAYERS]> {
    let mut order: SmallVec<[PlayerId; MAX_PLAYERS]> = SmallVec::new();
    if race.has_standings() {
        for pos in 0..MAX_PLAYERS {
            let Some(player) = race.player_in_position(pos) else {
                continue;
            };
            if roster.is_active(player) && !order.contains(&player) {
                order.push(player);
            }
        }
    }
    for player in roster.iter_active() {
        if !order.contains(&player) {
            order.push(player);
        }
    }
    order
}

/// The next target in the cycle order from `current`, wrapping around.
/// A `current` outside the order starts from the front (forward) or back.
fn cycle_from(
    roster: &Roster,
    race: &impl RaceView,
    current: Option<PlayerId>,
    forward: bool,
) -> Option<PlayerId> {
    let order = spectate_order(roster, race);
    if order.is_empty() {
        return None;
    }
    let idx = current.and_then(|c| order.iter().position(|&p| p == c));
    let next = match idx {
        None => {
            if forward {
                order[0]
            } else {
                order[order.len() - 1]
            }
        }
        Some(i) => {
            let len = order.len();
            if forward {
                order[(i + 1) % len]
            } else {
                order[(i + len - 1) % len]
            }
        }
    };
    Some(next)
}
