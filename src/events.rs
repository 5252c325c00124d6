//! Notifications emitted by the session and the iterator that drains them.

use std::collections::vec_deque::Drain;
use std::iter::FusedIterator;

use crate::{EliminationCause, PlayerId};

/// How a concluded match ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MatchOutcome {
    /// Exactly one player outlasted everyone else.
    Winner(
        /// The last player standing.
        PlayerId,
    ),
    /// The match was cut short offline (a local player fell): everyone still
    /// racing should be finalized at their current standings by the
    /// race-completion collaborator.
    FinalizedAtStandings,
}

/// Notifications the session emits as side effects of applying eliminations.
/// Drain them once per tick via [`KnockoutSession::events`] and react in the
/// embedding game (vanish the kart, update the HUD, move the camera).
///
/// # Forward Compatibility
///
/// This enum is marked `#[non_exhaustive]` because new event types may be
/// added in future versions. Always include a wildcard arm when matching.
///
/// [`KnockoutSession::events`]: crate::KnockoutSession::events
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum KnockoutEvent {
    /// A player was removed from play.
    PlayerEliminated {
        /// The eliminated player.
        player: PlayerId,
        /// The round the elimination counted against.
        round: u8,
        /// Why the player was removed.
        cause: EliminationCause,
    },
    /// A round concluded normally and the next one began.
    RoundAdvanced {
        /// The new (1-based) round number.
        round: u8,
        /// Players still in play.
        active: u8,
    },
    /// The spectating local view should re-target its camera.
    SpectateTargetChanged {
        /// The player the camera should now follow.
        target: PlayerId,
    },
    /// The match reached its terminal state.
    MatchConcluded {
        /// How it ended.
        outcome: MatchOutcome,
    },
}

/// A zero-allocation opaque iterator that drains events from a session.
///
/// Wraps the internal event queue drain so the public API doesn't expose
/// `std::collections::vec_deque::Drain` directly. Implements [`Iterator`],
/// [`DoubleEndedIterator`], [`ExactSizeIterator`] and [`FusedIterator`].
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct EventDrain<'a> {
    inner: Drain<'a, KnockoutEvent>,
}

impl<'a> EventDrain<'a> {
    pub(crate) fn from_drain(inner: Drain<'a, KnockoutEvent>) -> Self {
        Self { inner }
    }
}

impl Iterator for EventDrain<'_> {
    type Item = KnockoutEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for EventDrain<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl ExactSizeIterator for EventDrain<'_> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl FusedIterator for EventDrain<'_> {}

impl std::fmt::Debug for EventDrain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDrain")
            .field("remaining", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn advanced(round: u8) -> KnockoutEvent {
        KnockoutEvent::RoundAdvanced { round, active: 4 }
    }

    #[test]
    fn drain_yields_events_in_order() {
        let mut queue: VecDeque<KnockoutEvent> = VecDeque::new();
        queue.push_back(advanced(1));
        queue.push_back(advanced(2));
        queue.push_back(advanced(3));

        let drain = EventDrain::from_drain(queue.drain(..));
        let events: Vec<_> = drain.collect();
        assert_eq!(events, vec![advanced(1), advanced(2), advanced(3)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_is_fused_and_sized() {
        let mut queue: VecDeque<KnockoutEvent> = VecDeque::new();
        queue.push_back(advanced(1));

        let mut drain = EventDrain::from_drain(queue.drain(..));
        assert_eq!(drain.len(), 1);
        assert!(drain.next().is_some());
        assert!(drain.next().is_none());
        assert!(drain.next().is_none());
    }

    #[test]
    fn double_ended_iteration() {
        let mut queue: VecDeque<KnockoutEvent> = VecDeque::new();
        queue.push_back(advanced(1));
        queue.push_back(advanced(2));

        let mut drain = EventDrain::from_drain(queue.drain(..));
        assert_eq!(drain.next_back(), Some(advanced(2)));
        assert_eq!(drain.next(), Some(advanced(1)));
        assert!(drain.next().is_none());
    }

    #[test]
    fn debug_format_shows_remaining_count() {
        let mut queue: VecDeque<KnockoutEvent> = VecDeque::new();
        queue.push_back(advanced(1));
        let drain = EventDrain::from_drain(queue.drain(..));
        assert_eq!(format!("{drain:?}"), "EventDrain { remaining: 1 }");
    }
}
