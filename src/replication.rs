//! Host → client replication of elimination decisions.
//!
//! The protocol is one-directional and has no acknowledgements: the host
//! assigns each decision the next sequence number, embeds the resulting
//! [`EliminationRecord`] in every outgoing per-tick packet for a bounded
//! retransmission window, and then forgets it. Clients deduplicate by
//! sequence and apply each record exactly once. Loss inside the window is
//! recovered by repetition; loss past the window is an accepted risk, bounded
//! by the host's authoritative overwrite of round and active count on the
//! next record that does arrive.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::{PlayerId, MAX_PLAYERS};

/// How many frames a pending record keeps retransmitting before it expires
/// (~2 seconds at 60 fps). This is the protocol's sole loss-recovery
/// mechanism.
pub const RETRANSMIT_FRAMES: u16 = 120;

/// A replication sequence number.
///
/// `0` is reserved to mean "no event pending" and is skipped on wraparound, so
/// a live record always carries a non-zero sequence. The counter is 32 bits
/// wide; with one increment per elimination decision, wraparound aliasing is
/// unreachable within any real match.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Sequence(u32);

impl Sequence {
    /// The reserved "no event" value.
    pub const NONE: Sequence = Sequence(0);

    /// Creates a sequence from its raw value.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Sequence(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Whether this is the reserved "no event" value.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// The next sequence after this one, skipping the reserved 0.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Sequence {
        let raw = self.0.wrapping_add(1);
        if raw == 0 {
            Sequence(1)
        } else {
            Sequence(raw)
        }
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The wire record carried inside the game's existing per-tick state packet.
///
/// Player ids travel as raw bytes; out-of-range values are filtered on
/// receipt rather than rejected, per the protocol's silent-self-correction
/// policy. "No event pending" is encoded as `sequence == 0` (see
/// [`EliminationRecord::EMPTY`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EliminationRecord {
    /// The host's sequence number for this decision, or 0 for "none".
    pub sequence: Sequence,
    /// The 1-based round the decision concluded.
    pub round: u8,
    /// Players still in play after the decision, the client's new ground
    /// truth.
    pub active_count: u8,
    /// When set, the final elimination in the batch must not trigger normal
    /// round-completion bookkeeping (disconnect-driven decisions).
    pub suppress_round_advance: bool,
    /// The eliminated players, in the host's decision order. At most
    /// [`MAX_PLAYERS`] entries.
    pub eliminated: SmallVec<[u8; MAX_PLAYERS]>,
}

impl EliminationRecord {
    /// The record transmitted while no decision is pending.
    pub const EMPTY: EliminationRecord = EliminationRecord {
        sequence: Sequence::NONE,
        round: 0,
        active_count: 0,
        suppress_round_advance: false,
        eliminated: SmallVec::new_const(),
    };

    /// Whether this record carries a decision.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_none() || self.eliminated.is_empty()
    }
}

impl Default for EliminationRecord {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// A validated, deduplicated batch ready to apply, produced by
/// [`Inbox::accept`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicatedBatch {
    /// The round the host concluded with this decision.
    pub round: u8,
    /// The host's post-elimination active count.
    pub active_count: u8,
    /// Whether the final elimination suppresses round advance.
    pub suppress_round_advance: bool,
    /// The eliminated players, host decision order, invalid ids dropped.
    pub players: SmallVec<[PlayerId; MAX_PLAYERS]>,
}

/// Host side: holds the outstanding decision and retransmits it for a bounded
/// window.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    sequence: Sequence,
    pending: Option<Pending>,
}

#[derive(Debug, Clone)]
struct Pending {
    record: EliminationRecord,
    frames_left: u16,
}

impl Outbox {
    /// Creates an empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps a decision with the next sequence number and makes it the
    /// pending record. A new decision replaces any previous one still in its
    /// window, whose round and active count it supersedes anyway.
    pub fn publish(
        &mut self,
        players: &[PlayerId],
        round: u8,
        active_count: u8,
        suppress_round_advance: bool,
    ) -> Sequence {
        self.sequence = self.sequence.next();
        let record = EliminationRecord {
            sequence: self.sequence,
            round,
            active_count,
            suppress_round_advance,
            eliminated: players.iter().map(|p| p.as_u8()).collect(),
        };
        debug!(
            sequence = %self.sequence,
            round,
            active_count,
            suppress_round_advance,
            count = players.len(),
            "publishing elimination record"
        );
        self.pending = Some(Pending {
            record,
            frames_left: RETRANSMIT_FRAMES,
        });
        self.sequence
    }

    /// The record to embed in this tick's outgoing packets:
    /// the pending decision, or [`EliminationRecord::EMPTY`].
    #[must_use]
    pub fn record_for_tick(&self) -> EliminationRecord {
        self.pending
            .as_ref()
            .map_or(EliminationRecord::EMPTY, |p| p.record.clone())
    }

    /// Whether a decision is still inside its retransmission window.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Counts down the retransmission window; clears the record on expiry.
    pub fn tick(&mut self) {
        if let Some(pending) = self.pending.as_mut() {
            pending.frames_left = pending.frames_left.saturating_sub(1);
            if pending.frames_left == 0 {
                trace!(sequence = %pending.record.sequence, "pending record expired");
                self.pending = None;
            }
        }
    }

    /// Discards any pending record (match reset).
    pub fn clear(&mut self) {
        self.pending = None;
    }
}

/// Client side: deduplicates received records by strict sequence equality.
#[derive(Debug, Clone, Default)]
pub struct Inbox {
    last_applied: Sequence,
}

impl Inbox {
    /// Creates an inbox that has applied nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The sequence of the last applied record.
    #[must_use]
    pub fn last_applied(&self) -> Sequence {
        self.last_applied
    }

    /// Validates and deduplicates a received record.
    ///
    /// Returns `Some` exactly once per new sequence; empty records, repeats of
    /// the last applied sequence and batches whose ids are all out of range
    /// yield `None` without touching any state.
    pub fn accept(&mut self, record: &EliminationRecord) -> Option<ReplicatedBatch> {
        if record.is_empty() {
            return None;
        }
        if record.sequence == self.last_applied {
            trace!(sequence = %record.sequence, "duplicate record ignored");
            return None;
        }

        let players: SmallVec<[PlayerId; MAX_PLAYERS]> = record
            .eliminated
            .iter()
            .take(MAX_PLAYERS)
            .filter_map(|&id| PlayerId::new(id))
            .collect();
        if players.is_empty() {
            debug!(sequence = %record.sequence, "record with no valid player ids ignored");
            return None;
        }

        self.last_applied = record.sequence;
        Some(ReplicatedBatch {
            round: record.round,
            active_count: record.active_count,
            suppress_round_advance: record.suppress_round_advance,
            players,
        })
    }

    /// Forgets the applied history (match reset).
    pub fn clear(&mut self) {
        self.last_applied = Sequence::NONE;
    }
}

/// Binary codec for [`EliminationRecord`], for callers that ship the record as
/// its own datagram rather than embedding the struct in a larger packet.
///
/// Uses bincode's standard configuration with fixed-width integers so record
/// sizes are deterministic.
pub mod codec {
    use serde::{de::DeserializeOwned, Serialize};

    fn config() -> impl bincode::config::Config {
        bincode::config::standard().with_fixed_int_encoding()
    }

    /// Errors that can occur during encoding or decoding.
    ///
    /// Bincode's own errors are opaque, so the underlying message is carried
    /// as a string; codec failures are exceptional (corrupt data, protocol
    /// mismatch), never hot-path.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct CodecError {
        /// The underlying bincode error message.
        pub context: String,
    }

    impl std::fmt::Display for CodecError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "codec error: {}", self.context)
        }
    }

    impl std::error::Error for CodecError {}

    /// Encodes a serializable value into a fresh byte vector.
    pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
        bincode::serde::encode_to_vec(value, config()).map_err(|e| CodecError {
            context: e.to_string(),
        })
    }

    /// Decodes a value from bytes, returning it with the number of bytes read.
    pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<(T, usize), CodecError> {
        bincode::serde::decode_from_slice(bytes, config()).map_err(|e| CodecError {
            context: e.to_string(),
        })
    }
}
