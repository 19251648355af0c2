use super::error::TrackerError;
use crate::bencode::{decode_with, DecodeOptions};
use crate::constants::TRACKER_ANNOUNCE_INTERVAL;
use crate::peer::PeerId;
use bytes::Bytes;
use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tracing::{debug, warn};

const COMPACT_V4_LEN: usize = 6;
const COMPACT_V6_LEN: usize = 18;

/// A peer returned from a tracker.
///
/// The peer ID is only known from dictionary-form responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub addr: SocketAddr,
    pub peer_id: Option<PeerId>,
}

impl Peer {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            peer_id: None,
        }
    }

    pub fn with_id(addr: SocketAddr, peer_id: PeerId) -> Self {
        Self {
            addr,
            peer_id: Some(peer_id),
        }
    }

    /// Parses a peer from compact IPv4 format (6 bytes).
    ///
    /// Format: 4 bytes IP + 2 bytes port (big-endian).
    pub fn from_compact_v4(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < COMPACT_V4_LEN {
            return None;
        }
        let ip = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
        let port = u16::from_be_bytes([bytes[4], bytes[5]]);
        Some(Self::new(SocketAddr::new(IpAddr::V4(ip), port)))
    }

    /// Parses a peer from compact IPv6 format (18 bytes).
    ///
    /// Format: 16 bytes IP + 2 bytes port (big-endian).
    pub fn from_compact_v6(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < COMPACT_V6_LEN {
            return None;
        }
        let mut ip_bytes = [0u8; 16];
        ip_bytes.copy_from_slice(&bytes[..16]);
        let ip = Ipv6Addr::from(ip_bytes);
        let port = u16::from_be_bytes([bytes[16], bytes[17]]);
        Some(Self::new(SocketAddr::new(IpAddr::V6(ip), port)))
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peer_id {
            Some(ref id) => write!(f, "{} ({})", self.addr, id),
            None => write!(f, "{}", self.addr),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackerEvent {
    /// A regular, periodic announce.
    #[default]
    None,
    Started,
    Stopped,
    Completed,
}

impl TrackerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerEvent::None => "",
            TrackerEvent::Started => "started",
            TrackerEvent::Stopped => "stopped",
            TrackerEvent::Completed => "completed",
        }
    }
}

/// Tracker reply as it appears on the wire, generic over the shape of
/// `peers`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireResponse<P> {
    #[serde(rename = "failure reason")]
    pub failure_reason: Option<String>,
    #[serde(rename = "warning message")]
    pub warning_message: Option<String>,
    pub interval: Option<u32>,
    #[serde(rename = "min interval")]
    pub min_interval: Option<u32>,
    #[serde(rename = "tracker id")]
    pub tracker_id: Option<String>,
    pub complete: Option<u32>,
    pub incomplete: Option<u32>,
    #[serde(default)]
    pub peers: P,
    #[serde(default)]
    pub peers6: Bytes,
}

/// Reply whose `peers` is a packed string of 6-byte records.
pub type CompactResponse = WireResponse<Bytes>;

/// Reply whose `peers` is a list of dictionaries.
pub type DictResponse = WireResponse<Vec<DictPeer>>;

#[derive(Debug, Clone, Deserialize)]
pub struct DictPeer {
    #[serde(rename = "peer id")]
    pub peer_id: Option<Bytes>,
    pub ip: String,
    pub port: u16,
}

impl DictPeer {
    fn to_peer(&self) -> Option<Peer> {
        let ip: IpAddr = match self.ip.parse() {
            Ok(ip) => ip,
            Err(_) => {
                warn!(ip = %self.ip, "skipping peer with unparseable address");
                return None;
            }
        };
        let addr = SocketAddr::new(ip, self.port);
        Some(match self.peer_id.as_deref().and_then(PeerId::from_bytes) {
            Some(id) => Peer::with_id(addr, id),
            None => Peer::new(addr),
        })
    }
}

/// A successful announce, normalized from either wire form.
#[derive(Debug, Clone)]
pub struct AnnounceResponse {
    pub interval: u32,
    pub min_interval: Option<u32>,
    pub complete: Option<u32>,
    pub incomplete: Option<u32>,
    pub peers: Vec<Peer>,
    pub warning_message: Option<String>,
    pub tracker_id: Option<String>,
}

impl AnnounceResponse {
    pub fn new(interval: u32) -> Self {
        Self {
            interval,
            min_interval: None,
            complete: None,
            incomplete: None,
            peers: Vec::new(),
            warning_message: None,
            tracker_id: None,
        }
    }

    pub fn seeders(&self) -> u32 {
        self.complete.unwrap_or(0)
    }

    pub fn leechers(&self) -> u32 {
        self.incomplete.unwrap_or(0)
    }

    fn from_wire<P>(wire: WireResponse<P>, peers: Vec<Peer>) -> Result<Self, TrackerError> {
        if let Some(reason) = wire.failure_reason {
            return Err(TrackerError::Failure(reason));
        }

        let default_interval = TRACKER_ANNOUNCE_INTERVAL.as_secs() as u32;
        let mut response = Self::new(wire.interval.unwrap_or(default_interval));
        response.min_interval = wire.min_interval;
        response.complete = wire.complete;
        response.incomplete = wire.incomplete;
        response.warning_message = wire.warning_message;
        response.tracker_id = wire.tracker_id;
        response.peers = peers;
        response.peers.extend(parse_compact_peers6(&wire.peers6));
        Ok(response)
    }
}

/// Decodes an announce reply.
///
/// The compact form is tried first; if the body does not have that shape
/// the dictionary form is tried. Keys a tracker adds beyond the known ones
/// are ignored.
pub fn parse_response(body: &[u8]) -> Result<AnnounceResponse, TrackerError> {
    let options = DecodeOptions::default().ignore_unknown_fields();

    let compact_err = match decode_with::<CompactResponse>(body, &options) {
        Ok(compact) => {
            let peers = parse_compact_peers(&compact.peers);
            return AnnounceResponse::from_wire(compact, peers);
        }
        Err(e) => e,
    };
    debug!(error = %compact_err, "not a compact response, trying dictionary form");

    match decode_with::<DictResponse>(body, &options) {
        Ok(dict) => {
            let peers = dict.peers.iter().filter_map(DictPeer::to_peer).collect();
            AnnounceResponse::from_wire(dict, peers)
        }
        Err(dict_err) => Err(TrackerError::InvalidResponse(format!(
            "compact: {}; dictionary: {}",
            compact_err, dict_err
        ))),
    }
}

pub fn parse_compact_peers(data: &[u8]) -> Vec<Peer> {
    let chunks = data.chunks_exact(COMPACT_V4_LEN);
    if !chunks.remainder().is_empty() {
        warn!(
            len = data.len(),
            "compact peer list is not a multiple of {} bytes", COMPACT_V4_LEN
        );
    }
    chunks.filter_map(Peer::from_compact_v4).collect()
}

pub fn parse_compact_peers6(data: &[u8]) -> Vec<Peer> {
    let chunks = data.chunks_exact(COMPACT_V6_LEN);
    if !chunks.remainder().is_empty() {
        warn!(
            len = data.len(),
            "compact peer6 list is not a multiple of {} bytes", COMPACT_V6_LEN
        );
    }
    chunks.filter_map(Peer::from_compact_v6).collect()
}
