//! Client identification, ports and tracker timing.
//!
//! Tracker intervals follow the values common clients fall back to when a
//! tracker omits `interval` from its response.

use std::time::Duration;

// ============================================================================
// Client identification
// ============================================================================

/// Client ID prefix for peer ID generation (Azureus-style)
pub const CLIENT_PREFIX: &str = "-BC0001-";

/// User agent string for HTTP requests
pub const USER_AGENT: &str = "btcodec/0.1.0";

// ============================================================================
// Ports
// ============================================================================

/// Default BitTorrent listen port
pub const DEFAULT_PORT: u16 = 6881;

// ============================================================================
// Timeouts - Tracker
// ============================================================================

/// HTTP tracker request timeout
pub const HTTP_TRACKER_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Intervals - Tracker
// ============================================================================

/// Announce interval assumed when a tracker does not send one
pub const TRACKER_ANNOUNCE_INTERVAL: Duration = Duration::from_secs(1800);
