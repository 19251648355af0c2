//! Client-wide settings shared by every torrent.

use std::time::Duration;

use crate::constants::{DEFAULT_PORT, HTTP_TRACKER_TIMEOUT};
use crate::peer::PeerId;

/// Identity and network settings announced to trackers.
///
/// ```
/// use btcodec::config::ClientConfig;
///
/// let config = ClientConfig::default().with_port(7000);
/// assert_eq!(config.port, 7000);
/// assert_eq!(config.peer_id.client_id(), Some("BC0001"));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub peer_id: PeerId,
    pub port: u16,
    /// Upper bound on a single HTTP announce round trip.
    pub announce_timeout: Duration,
}

impl ClientConfig {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_announce_timeout(mut self, timeout: Duration) -> Self {
        self.announce_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            peer_id: PeerId::generate(),
            port: DEFAULT_PORT,
            announce_timeout: HTTP_TRACKER_TIMEOUT,
        }
    }
}
