//! # Lap Knockout
//!
//! A host-authoritative, replicated elimination state machine for multiplayer
//! races: each round of a match, the worst-placed players are knocked out of
//! play until a single winner remains. One peer (the host) decides every
//! elimination; clients apply the host's decisions exactly once, in order,
//! over an unreliable best-effort transport with no acknowledgements.
//!
//! The crate is deliberately narrow. It owns the "who is still racing" set and
//! nothing else: rendering, input decoding, track loading and the rest of the
//! game read from it through queries and [`KnockoutEvent`]s, and feed it
//! through a handful of per-tick hooks.
//!
//! ## Control flow
//!
//! Once per simulation tick the embedding game calls
//! [`KnockoutSession::advance_tick`] with a view of race progress and session
//! connectivity. Lap crossings accumulate in the round tracker; when enough
//! players have crossed, the host resolves the round, eliminates the stragglers
//! and broadcasts the decision. Transport glue moves one
//! [`EliminationRecord`] per tick in each direction via
//! [`KnockoutSession::outgoing_record`] and
//! [`KnockoutSession::receive_record`].
//!
//! ## Example
//!
//! ```
//! use lap_knockout::{MatchRole, PlayerId, SessionBuilder};
//!
//! let session = SessionBuilder::new()
//!     .with_player_count(8)
//!     .with_eliminations_per_round(1)
//!     .with_track_laps(Some(3))
//!     .with_role(MatchRole::Offline)
//!     .start()
//!     .unwrap();
//!
//! assert_eq!(session.active_count(), 8);
//! assert!(session.is_active(PlayerId::new(0).unwrap()));
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use builder::SessionBuilder;
pub use error::KnockoutError;
pub use events::{EventDrain, KnockoutEvent, MatchOutcome};
pub use planner::EliminationPlan;
pub use replication::{EliminationRecord, Sequence};
pub use session::KnockoutSession;
pub use spectator::SpectateCommand;

pub mod builder;
pub mod error;
pub mod events;
pub mod planner;
pub mod replication;
pub mod session;
pub mod spectator;

#[doc(hidden)]
pub mod disconnect;
#[doc(hidden)]
pub mod roster;
#[doc(hidden)]
pub mod round;

/// Convenience re-exports for the common case.
pub mod prelude {
    pub use crate::{
        EliminationCause, EliminationRecord, KnockoutError, KnockoutEvent, KnockoutSession,
        MatchOutcome, MatchRole, PeerId, PeerMask, PlayerId, RaceView, SessionBuilder, SessionView,
        SpectateCommand,
    };
}

// #############
// # CONSTANTS #
// #############

/// Maximum number of participants in a match. This is a true domain invariant,
/// not a growth limit: every arena in the crate is sized by it.
pub const MAX_PLAYERS: usize = 12;

/// Maximum number of rounds a plan can hold. A match of [`MAX_PLAYERS`]
/// eliminating one player per round needs exactly `MAX_PLAYERS - 1` rounds.
pub const MAX_ROUNDS: usize = MAX_PLAYERS - 1;

/// Default lap count assumed when track metadata is unavailable.
pub const DEFAULT_TRACK_LAPS: u8 = 3;

// #############
// #  NEWTYPES #
// #############

/// A logical participant identifier, always in `0..MAX_PLAYERS`.
///
/// `PlayerId` is validated at construction, so any value of this type can be
/// used to index the crate's fixed-size arenas without further checks.
///
/// # Examples
///
/// ```
/// use lap_knockout::PlayerId;
///
/// let p = PlayerId::new(3).unwrap();
/// assert_eq!(p.index(), 3);
/// assert!(PlayerId::new(12).is_none());
/// ```
// No serde derives: deserialization would bypass the range check. Player ids
// travel as raw bytes in the wire record and are re-validated on receipt.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(u8);

impl PlayerId {
    /// Creates a `PlayerId`, returning `None` when `id` is out of range.
    #[inline]
    #[must_use]
    pub const fn new(id: u8) -> Option<Self> {
        if (id as usize) < MAX_PLAYERS {
            Some(PlayerId(id))
        } else {
            None
        }
    }

    /// Returns the raw id as a `u8`.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Returns the raw id as a `usize`, suitable for arena indexing.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Iterates over every possible player id, in ascending order.
    pub fn all() -> impl Iterator<Item = PlayerId> {
        (0..MAX_PLAYERS as u8).map(PlayerId)
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A transport-level peer identifier, distinct from [`PlayerId`]: multiple
/// local players can share one peer in split-screen play.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerId(u8);

impl PeerId {
    /// Creates a `PeerId`, returning `None` when `id` cannot appear in the
    /// reachable-peer bitmap (ids are bit positions in a [`PeerMask`]).
    #[inline]
    #[must_use]
    pub const fn new(id: u8) -> Option<Self> {
        if id < 32 {
            Some(PeerId(id))
        } else {
            None
        }
    }

    /// Returns the raw id as a `u8`.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bitmap of currently-reachable peers, sampled once per tick from the
/// session layer. Bit `n` set means [`PeerId`] `n` is reachable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PeerMask(u32);

impl PeerMask {
    /// The empty mask: no peers reachable.
    pub const EMPTY: PeerMask = PeerMask(0);

    /// Creates a mask from its raw bit representation.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        PeerMask(bits)
    }

    /// Returns the raw bit representation.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` when the given peer's bit is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, peer: PeerId) -> bool {
        self.0 & (1 << peer.as_u8()) != 0
    }

    /// Returns `true` when no peer bits are set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the peers present in `self` but absent in `other`.
    #[inline]
    #[must_use]
    pub const fn lost_versus(self, other: PeerMask) -> PeerMask {
        PeerMask(self.0 & !other.0)
    }

    /// Iterates over the peers whose bits are set, in ascending id order.
    pub fn iter(self) -> impl Iterator<Item = PeerId> {
        (0u8..32).filter_map(move |bit| {
            if self.0 & (1 << bit) != 0 {
                PeerId::new(bit)
            } else {
                None
            }
        })
    }
}

// #############
// #   ENUMS   #
// #############

/// The authority role this session plays in the match.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum MatchRole {
    /// This peer decides eliminations and replicates them to everyone else.
    Host,
    /// This peer applies replicated decisions and never resolves rounds
    /// locally.
    Client,
    /// No networking at all. Decisions are applied directly, and a local
    /// player's elimination ends the whole match at current standings
    /// instead of entering spectator mode.
    #[default]
    Offline,
}

impl MatchRole {
    /// Returns `true` for [`MatchRole::Host`] and [`MatchRole::Offline`]:
    /// roles that resolve rounds themselves rather than waiting for the
    /// network.
    #[inline]
    #[must_use]
    pub const fn decides_locally(self) -> bool {
        !matches!(self, MatchRole::Client)
    }

    /// Returns `true` when the match is played over a network room.
    #[inline]
    #[must_use]
    pub const fn is_online(self) -> bool {
        !matches!(self, MatchRole::Offline)
    }
}

/// Why a player was removed from play.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EliminationCause {
    /// The player was among the worst placed when a round resolved.
    RoundLoss,
    /// The player's peer dropped out of the session.
    Disconnect,
}

impl std::fmt::Display for EliminationCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EliminationCause::RoundLoss => write!(f, "round loss"),
            EliminationCause::Disconnect => write!(f, "disconnect"),
        }
    }
}

// #############
// #  TRAITS   #
// #############

/// Read-only view of live race progress, supplied by the embedding game once
/// per tick.
///
/// The session never caches standings across ticks; it re-reads them at every
/// decision point so the elimination order always reflects the racing state
/// the caller considers current.
pub trait RaceView {
    /// The lap the player is currently on (1-based; 1 means "still on the
    /// first lap"). Players the view knows nothing about report 0.
    fn current_lap(&self, player: PlayerId) -> u16;

    /// The player currently holding the given race position (0 = leader), or
    /// `None` when the position is empty or standings are unavailable.
    fn player_in_position(&self, position: usize) -> Option<PlayerId>;

    /// Whether live standings are available at all. When this returns `false`
    /// the session falls back to crossing order for elimination tie-breaks.
    fn has_standings(&self) -> bool;
}

/// Read-only view of session connectivity, supplied by the networking layer
/// once per tick.
pub trait SessionView {
    /// The bitmap of peers currently reachable from this machine.
    fn reachable_peers(&self) -> PeerMask;

    /// The peer a player's inputs originate from, or `None` when unknown.
    fn peer_of(&self, player: PlayerId) -> Option<PeerId>;

    /// The peer identifier of this machine, or `None` offline.
    fn local_peer(&self) -> Option<PeerId>;

    /// Whether the player is controlled on this machine. The default compares
    /// the player's peer against [`SessionView::local_peer`]; offline
    /// implementations will usually override this.
    fn is_local(&self, player: PlayerId) -> bool {
        match (self.peer_of(player), self.local_peer()) {
            (Some(peer), Some(local)) => peer == local,
            _ => false,
        }
    }
}

// ###################
// # UNIT TESTS      #
// ###################
