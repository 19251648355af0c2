//! Peer identity.
//!
//! Only the identifier is modeled here; the peer addresses learned from
//! trackers live in [`crate::tracker::Peer`].

mod peer_id;

pub use peer_id::PeerId;
