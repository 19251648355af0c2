use super::error::TrackerError;
use super::http::{AnnounceRequest, HttpTracker};
use super::pool::{Counter, PeerPool};
use super::response::TrackerEvent;
use crate::config::ClientConfig;
use crate::metainfo::{InfoHash, Metainfo};
use futures::future::join_all;
use tracing::{debug, warn};

/// Combined result of announcing to every tracker of a torrent.
#[derive(Debug, Default)]
pub struct AnnounceSummary {
    /// Sum of `complete` over the trackers that answered.
    pub seeders: u64,
    /// Sum of `incomplete` over the trackers that answered.
    pub leechers: u64,
    pub peers: PeerPool,
    /// Number of trackers that returned a usable response.
    pub responded: usize,
}

/// All trackers of one torrent, announced to together.
pub struct TrackerSet {
    trackers: Vec<HttpTracker>,
    info_hash: InfoHash,
    config: ClientConfig,
}

impl TrackerSet {
    /// One client per unique HTTP(S) tracker of the torrent.
    pub fn new(metainfo: &Metainfo, config: ClientConfig) -> Self {
        Self::from_urls(metainfo.trackers(), metainfo.info_hash, config)
    }

    pub fn from_urls<I, S>(urls: I, info_hash: InfoHash, config: ClientConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut trackers: Vec<HttpTracker> = Vec::new();

        for url in urls {
            let url = url.as_ref();
            if trackers.iter().any(|t| t.url() == url) {
                continue;
            }
            match HttpTracker::with_timeout(url, config.announce_timeout) {
                Ok(tracker) => trackers.push(tracker),
                Err(e) => debug!(tracker = url, error = %e, "skipping tracker"),
            }
        }

        Self {
            trackers,
            info_hash,
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.trackers.iter().map(HttpTracker::url)
    }

    /// Announces to every tracker concurrently and aggregates the answers.
    ///
    /// A tracker that fails is logged and left out of the totals; this
    /// never fails as a whole.
    pub async fn announce(
        &self,
        uploaded: u64,
        downloaded: u64,
        left: u64,
        event: TrackerEvent,
    ) -> AnnounceSummary {
        let request = AnnounceRequest {
            info_hash: self.info_hash,
            peer_id: self.config.peer_id,
            port: self.config.port,
            uploaded,
            downloaded,
            left,
            event,
        };

        let seeders = Counter::new();
        let leechers = Counter::new();
        let responded = Counter::new();
        let peers = PeerPool::new();

        let (request, seeders_ref, leechers_ref, responded_ref, peers_ref) =
            (&request, &seeders, &leechers, &responded, &peers);

        let announces = self.trackers.iter().map(move |tracker| async move {
            match tracker.announce(request).await {
                Ok(response) => {
                    seeders_ref.add(u64::from(response.seeders()));
                    leechers_ref.add(u64::from(response.leechers()));
                    peers_ref.extend(response.peers);
                    responded_ref.add(1);
                }
                Err(TrackerError::TooSoon(wait)) => {
                    debug!(tracker = tracker.url(), ?wait, "announce skipped");
                }
                Err(e) => {
                    warn!(tracker = tracker.url(), error = %e, "announce failed");
                }
            }
        });
        join_all(announces).await;

        AnnounceSummary {
            seeders: seeders.value(),
            leechers: leechers.value(),
            responded: responded.value() as usize,
            peers,
        }
    }
}
