use super::response::Peer;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing total shared between concurrent announces.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

/// Peers collected from trackers, unique by socket address.
///
/// A peer seen again replaces the earlier entry, except that a known peer
/// ID is never replaced by an unknown one.
#[derive(Debug, Default)]
pub struct PeerPool {
    peers: RwLock<HashMap<SocketAddr, Peer>>,
}

impl PeerPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, peer: Peer) {
        let mut peers = self.peers.write();
        match peers.get_mut(&peer.addr) {
            Some(existing) => {
                if peer.peer_id.is_some() {
                    existing.peer_id = peer.peer_id;
                }
            }
            None => {
                peers.insert(peer.addr, peer);
            }
        }
    }

    pub fn extend(&self, peers: impl IntoIterator<Item = Peer>) {
        for peer in peers {
            self.add(peer);
        }
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.peers.read().contains_key(addr)
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// Snapshot of the pool, ordered by address.
    pub fn peers(&self) -> Vec<Peer> {
        let mut peers: Vec<Peer> = self.peers.read().values().cloned().collect();
        peers.sort_by_key(|p| p.addr);
        peers
    }

    /// Moves every peer of `other` into this pool.
    pub fn merge(&self, other: PeerPool) {
        self.extend(other.peers.into_inner().into_values());
    }
}

impl fmt::Display for PeerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for peer in self.peers() {
            writeln!(f, "{}", peer)?;
        }
        Ok(())
    }
}
