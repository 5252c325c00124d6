//! Fluent construction of a [`KnockoutSession`].

use crate::disconnect::DISCONNECT_GRACE_FRAMES;
use crate::session::KnockoutSession;
use crate::{KnockoutError, MatchRole, DEFAULT_TRACK_LAPS, MAX_PLAYERS};

/// Builds a [`KnockoutSession`] for one match.
///
/// Starting the session is the explicit "new match" signal: all round,
/// replication and spectator state begins from scratch, and a rematch in the
/// same process goes through [`KnockoutSession::reset_match`] or a fresh
/// builder. The session never infers a restart from observed race state.
///
/// # Examples
///
/// ```
/// use lap_knockout::{MatchRole, SessionBuilder};
///
/// let session = SessionBuilder::new()
///     .with_player_count(8)
///     .with_eliminations_per_round(2)
///     .with_role(MatchRole::Host)
///     .start()
///     .unwrap();
/// assert_eq!(session.round(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    player_count: u8,
    per_round: u8,
    track_laps: Option<u8>,
    role: MatchRole,
    grace_frames: u16,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    /// Creates a builder with defaults: 2 players, 1 elimination per round,
    /// unknown track laps, [`MatchRole::Offline`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            player_count: 2,
            per_round: 1,
            track_laps: None,
            role: MatchRole::Offline,
            grace_frames: DISCONNECT_GRACE_FRAMES,
        }
    }

    /// Sets the number of participants (2 to [`MAX_PLAYERS`]), fixed for the
    /// match's duration.
    #[must_use]
    pub fn with_player_count(mut self, count: u8) -> Self {
        self.player_count = count;
        self
    }

    /// Sets the configured elimination rate per round. A rate of 0 is treated
    /// as 1 when the plan is built.
    #[must_use]
    pub fn with_eliminations_per_round(mut self, per_round: u8) -> Self {
        self.per_round = per_round;
        self
    }

    /// Sets the track's lap count. `None` (or `Some(0)`) falls back to
    /// [`DEFAULT_TRACK_LAPS`], matching missing track metadata.
    #[must_use]
    pub fn with_track_laps(mut self, laps: Option<u8>) -> Self {
        self.track_laps = laps;
        self
    }

    /// Sets the authority role this session plays.
    #[must_use]
    pub fn with_role(mut self, role: MatchRole) -> Self {
        self.role = role;
        self
    }

    /// Overrides the start-of-match disconnect grace window, in frames.
    /// Defaults to [`DISCONNECT_GRACE_FRAMES`].
    #[must_use]
    pub fn with_disconnect_grace(mut self, frames: u16) -> Self {
        self.grace_frames = frames;
        self
    }

    /// Validates the configuration and starts the match.
    pub fn start(self) -> Result<KnockoutSession, KnockoutError> {
        if self.player_count < 2 || self.player_count as usize > MAX_PLAYERS {
            return Err(KnockoutError::InvalidPlayerCount {
                count: self.player_count,
            });
        }
        let track_laps = match self.track_laps {
            Some(laps) if laps > 0 => laps,
            _ => DEFAULT_TRACK_LAPS,
        };
        Ok(KnockoutSession::new(
            self.player_count,
            self.per_round,
            track_laps,
            self.role,
            self.grace_frames,
        ))
    }
}
