//! Shared race and session fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Once;

use lap_knockout::{PeerId, PeerMask, PlayerId, RaceView, SessionView, MAX_PLAYERS};

static INIT: Once = Once::new();

/// Routes tracing output through the test harness so `--nocapture` shows the
/// session's decision log.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Scriptable race state: per-player lap counters plus a standings order
/// (`order[0]` is the leader).
pub struct RaceStub {
    pub laps: [u16; MAX_PLAYERS],
    pub order: Vec<u8>,
}

impl RaceStub {
    pub fn new(players: u8) -> Self {
        Self {
            laps: [1; MAX_PLAYERS],
            order: (0..players).collect(),
        }
    }

    /// Advances every listed player one lap.
    pub fn complete_lap(&mut self, players: &[u8]) {
        for &p in players {
            self.laps[p as usize] += 1;
        }
    }
}

impl RaceView for RaceStub {
    fn current_lap(&self, player: PlayerId) -> u16 {
        self.laps[player.index()]
    }

    fn player_in_position(&self, position: usize) -> Option<PlayerId> {
        self.order.get(position).copied().and_then(PlayerId::new)
    }

    fn has_standings(&self) -> bool {
        true
    }
}

/// Scriptable connectivity: player `n` rides on peer `n`, and the local peer
/// marks which player is controlled on this machine.
pub struct NetStub {
    pub reachable: PeerMask,
    pub local: Option<PeerId>,
}

impl NetStub {
    /// The first `players` peers reachable, with the given local peer.
    pub fn new(players: u8, local: Option<u8>) -> Self {
        Self {
            reachable: PeerMask::from_bits((1u32 << players) - 1),
            local: local.and_then(PeerId::new),
        }
    }

    /// Marks one peer as dropped.
    pub fn drop_peer(&mut self, peer: u8) {
        self.reachable = PeerMask::from_bits(self.reachable.bits() & !(1 << peer));
    }
}

impl SessionView for NetStub {
    fn reachable_peers(&self) -> PeerMask {
        self.reachable
    }

    fn peer_of(&self, player: PlayerId) -> Option<PeerId> {
        PeerId::new(player.as_u8())
    }

    fn local_peer(&self) -> Option<PeerId> {
        self.local
    }
}

pub fn pid(id: u8) -> PlayerId {
    PlayerId::new(id).expect("test player id in range")
}
