//! HTTP tracker protocol (BEP-3, BEP-7, BEP-23)
//!
//! Announce replies are decoded with the bencode codec in either the compact
//! or the dictionary peer form. [`TrackerSet`] announces to all trackers of
//! a torrent at once and merges what they return.

mod error;
mod http;
mod pool;
mod response;
mod set;

pub use error::TrackerError;
pub use http::{AnnounceRequest, HttpTracker};
pub use pool::{Counter, PeerPool};
pub use response::{
    parse_compact_peers, parse_compact_peers6, parse_response, AnnounceResponse,
    CompactResponse, DictPeer, DictResponse, Peer, TrackerEvent, WireResponse,
};
pub use set::{AnnounceSummary, TrackerSet};

#[cfg(test)]
mod tests;
