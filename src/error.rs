//! Error types for fallible session operations.

use std::error::Error;
use std::fmt;
use std::fmt::Display;

use crate::PlayerId;

/// This enum contains all error messages this library can return. Fallible API
/// functions generally return a [`Result<(), KnockoutError>`].
///
/// Note that malformed or stale replicated records are *not* errors: per the
/// protocol they are silently ignored, since the retransmission window and the
/// host's authoritative state make them self-correcting.
///
/// [`Result<(), KnockoutError>`]: std::result::Result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KnockoutError {
    /// A match needs at least 2 and at most [`MAX_PLAYERS`](crate::MAX_PLAYERS) participants.
    InvalidPlayerCount {
        /// The participant count that was rejected.
        count: u8,
    },
    /// The referenced player is not part of this match.
    UnknownPlayer {
        /// The player that was rejected.
        player: PlayerId,
    },
    /// The match has already concluded; only a reset can revive the session.
    MatchConcluded,
    /// The operation is only valid for the host of an online match.
    NotHost,
}

impl Display for KnockoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnockoutError::InvalidPlayerCount { count } => {
                write!(f, "Invalid player count {count}: a match needs 2 to 12 participants")
            }
            KnockoutError::UnknownPlayer { player } => {
                write!(f, "Player {player} is not part of this match")
            }
            KnockoutError::MatchConcluded => {
                write!(f, "The match has already concluded; reset it to start a new one")
            }
            KnockoutError::NotHost => {
                write!(f, "Only the host of an online match may perform this operation")
            }
        }
    }
}

impl Error for KnockoutError {}
