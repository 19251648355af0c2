//! btcodec - Bencode codec with BitTorrent metainfo and tracker consumers
//!
//! The core of the crate is a `serde`-driven bencode codec ([BEP-3]) that
//! binds dictionaries to Rust records by normalized field name. The other
//! modules use it to read `.torrent` files and talk to HTTP trackers.
//!
//! # Modules
//!
//! - [`bencode`] - Typed and dynamic bencode encoding/decoding
//! - [`metainfo`] - Torrent metainfo, info hashes, magnet links
//! - [`tracker`] - HTTP tracker announces and multi-tracker fan-out
//! - [`torrent`] - Per-torrent transfer state
//! - [`peer`] - Peer identifiers
//! - [`config`] - Client settings
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

pub mod bencode;
pub mod config;
pub mod constants;
pub mod metainfo;
pub mod peer;
pub mod torrent;
pub mod tracker;

pub use bencode::{decode, decode_with, encode, BencodeError, DecodeOptions, Value};
pub use config::ClientConfig;
pub use metainfo::{File, Info, InfoHash, MagnetLink, Metainfo, MetainfoError};
pub use peer::PeerId;
pub use torrent::Torrent;
pub use tracker::{
    AnnounceRequest, AnnounceResponse, Counter, HttpTracker, Peer, PeerPool, TrackerError,
    TrackerEvent, TrackerSet,
};
