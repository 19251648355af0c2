use super::error::TrackerError;
use super::response::{parse_response, AnnounceResponse, TrackerEvent};
use crate::constants::{HTTP_TRACKER_TIMEOUT, USER_AGENT};
use crate::metainfo::InfoHash;
use crate::peer::PeerId;
use parking_lot::Mutex;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Parameters of one announce.
#[derive(Debug, Clone)]
pub struct AnnounceRequest {
    pub info_hash: InfoHash,
    pub peer_id: PeerId,
    pub port: u16,
    pub uploaded: u64,
    pub downloaded: u64,
    pub left: u64,
    pub event: TrackerEvent,
}

#[derive(Debug, Default)]
struct AnnounceState {
    last_announce: Option<Instant>,
    wait: Duration,
    tracker_id: Option<String>,
}

/// Client for a single HTTP(S) tracker.
///
/// Remembers the `tracker id` the tracker hands out and refuses regular
/// announces until the tracker's `min interval` (or `interval`) has passed.
/// Announces carrying an event are always sent.
pub struct HttpTracker {
    client: Client,
    url: String,
    state: Mutex<AnnounceState>,
}

impl HttpTracker {
    pub fn new(url: &str) -> Result<Self, TrackerError> {
        Self::with_timeout(url, HTTP_TRACKER_TIMEOUT)
    }

    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self, TrackerError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(TrackerError::InvalidUrl(url.to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(TrackerError::Http)?;

        Ok(Self {
            client,
            url: url.to_string(),
            state: Mutex::new(AnnounceState::default()),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn tracker_id(&self) -> Option<String> {
        self.state.lock().tracker_id.clone()
    }

    /// Time left before a regular announce is allowed again.
    pub fn remaining_wait(&self) -> Option<Duration> {
        let state = self.state.lock();
        let elapsed = state.last_announce?.elapsed();
        state.wait.checked_sub(elapsed).filter(|d| !d.is_zero())
    }

    pub async fn announce(
        &self,
        request: &AnnounceRequest,
    ) -> Result<AnnounceResponse, TrackerError> {
        if request.event == TrackerEvent::None {
            if let Some(remaining) = self.remaining_wait() {
                return Err(TrackerError::TooSoon(remaining));
            }
        }

        let url = self.announce_url(request);
        debug!(tracker = %self.url, event = request.event.as_str(), "announcing");

        let response = self.client.get(&url).send().await.map_err(from_reqwest)?;
        let body = response.bytes().await.map_err(from_reqwest)?;
        let response = parse_response(&body)?;

        if let Some(ref warning) = response.warning_message {
            warn!(tracker = %self.url, %warning, "tracker warning");
        }
        debug!(
            tracker = %self.url,
            peers = response.peers.len(),
            interval = response.interval,
            "announce succeeded"
        );

        let mut state = self.state.lock();
        state.last_announce = Some(Instant::now());
        state.wait = Duration::from_secs(u64::from(
            response.min_interval.unwrap_or(response.interval),
        ));
        if let Some(ref id) = response.tracker_id {
            state.tracker_id = Some(id.clone());
        }

        Ok(response)
    }

    /// Full announce URL including the query string.
    pub fn announce_url(&self, request: &AnnounceRequest) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        let mut url = format!(
            "{}{}info_hash={}&peer_id={}&port={}&uploaded={}&downloaded={}&left={}&compact=1",
            self.url,
            separator,
            request.info_hash.url_encoded(),
            request.peer_id.url_encoded(),
            request.port,
            request.uploaded,
            request.downloaded,
            request.left
        );

        let event = request.event.as_str();
        if !event.is_empty() {
            url.push_str("&event=");
            url.push_str(event);
        }

        if let Some(id) = self.tracker_id() {
            url.push_str("&trackerid=");
            url.push_str(&crate::metainfo::percent_encode(id.as_bytes()));
        }

        url
    }
}

fn from_reqwest(e: reqwest::Error) -> TrackerError {
    if e.is_timeout() {
        TrackerError::Timeout
    } else {
        TrackerError::Http(e)
    }
}
