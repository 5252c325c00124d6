//! Host-side detection of dropped peers.

use tracing::debug;

use crate::PeerMask;

/// Frames to wait after match start before missing peers count as
/// disconnects (~3 seconds at 60 fps). Connections are still stabilizing in
/// that window and the bitmap flickers.
pub const DISCONNECT_GRACE_FRAMES: u16 = 180;

/// Compares the reachable-peer bitmap against the previous tick's sample and
/// reports peers that vanished.
///
/// Only the host runs one of these; clients learn about disconnects through
/// replicated elimination records like any other decision.
#[derive(Debug, Clone)]
pub struct DisconnectMonitor {
    grace_frames: u16,
    last_seen: PeerMask,
}

impl Default for DisconnectMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl DisconnectMonitor {
    /// Creates a monitor with the full grace window remaining.
    #[must_use]
    pub fn new() -> Self {
        Self::with_grace(DISCONNECT_GRACE_FRAMES)
    }

    /// Creates a monitor with a custom grace window, for tests and tuning.
    #[must_use]
    pub fn with_grace(grace_frames: u16) -> Self {
        Self {
            grace_frames,
            last_seen: PeerMask::EMPTY,
        }
    }

    /// Whether the start-of-match grace window is still open.
    #[must_use]
    pub fn in_grace_window(&self) -> bool {
        self.grace_frames > 0
    }

    /// Feeds this tick's bitmap and returns the peers lost since the last
    /// sample. During the grace window the sample is recorded but nothing is
    /// ever reported. A previously-empty sample also reports nothing: there
    /// is no baseline to have lost peers from.
    pub fn sample(&mut self, reachable: PeerMask) -> PeerMask {
        if self.grace_frames > 0 {
            self.grace_frames -= 1;
            self.last_seen = reachable;
            return PeerMask::EMPTY;
        }

        let lost = if self.last_seen.is_empty() {
            PeerMask::EMPTY
        } else {
            self.last_seen.lost_versus(reachable)
        };
        if !lost.is_empty() {
            debug!(lost = format_args!("{:#010b}", lost.bits()), "peers lost");
        }
        self.last_seen = reachable;
        lost
    }
}
