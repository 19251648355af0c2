//! Per-torrent transfer state.
//!
//! A [`Torrent`] ties a parsed [`Metainfo`] to its trackers and keeps the
//! transfer totals they are told about.

use crate::config::ClientConfig;
use crate::metainfo::{InfoHash, Metainfo};
use crate::tracker::{PeerPool, TrackerEvent, TrackerSet};
use tracing::info;

pub struct Torrent {
    metainfo: Metainfo,
    uploaded: u64,
    downloaded: u64,
    seeders: u64,
    leechers: u64,
    peers: PeerPool,
    trackers: TrackerSet,
}

impl Torrent {
    pub fn new(metainfo: Metainfo, config: ClientConfig) -> Self {
        let trackers = TrackerSet::new(&metainfo, config);
        Self {
            metainfo,
            uploaded: 0,
            downloaded: 0,
            seeders: 0,
            leechers: 0,
            peers: PeerPool::new(),
            trackers,
        }
    }

    pub fn metainfo(&self) -> &Metainfo {
        &self.metainfo
    }

    pub fn info_hash(&self) -> InfoHash {
        self.metainfo.info_hash
    }

    pub fn trackers(&self) -> &TrackerSet {
        &self.trackers
    }

    /// Bytes still missing; never underflows.
    pub fn left(&self) -> u64 {
        self.metainfo.total_length().saturating_sub(self.downloaded)
    }

    pub fn uploaded(&self) -> u64 {
        self.uploaded
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }

    pub fn add_uploaded(&mut self, bytes: u64) {
        self.uploaded = self.uploaded.saturating_add(bytes);
    }

    pub fn add_downloaded(&mut self, bytes: u64) {
        self.downloaded = self.downloaded.saturating_add(bytes);
    }

    pub fn reset_uploaded(&mut self) {
        self.uploaded = 0;
    }

    pub fn reset_downloaded(&mut self) {
        self.downloaded = 0;
    }

    /// Seeder count from the last announce any tracker answered.
    pub fn seeders(&self) -> u64 {
        self.seeders
    }

    pub fn leechers(&self) -> u64 {
        self.leechers
    }

    /// Every peer learned so far.
    pub fn peers(&self) -> &PeerPool {
        &self.peers
    }

    /// Announces to all trackers and folds the answers into this torrent.
    ///
    /// Returns how many trackers responded. Swarm counts are kept from the
    /// previous round when none did.
    pub async fn request_peers(&mut self, event: TrackerEvent) -> usize {
        let summary = self
            .trackers
            .announce(self.uploaded, self.downloaded, self.left(), event)
            .await;

        if summary.responded > 0 {
            self.seeders = summary.seeders;
            self.leechers = summary.leechers;
        }
        self.peers.merge(summary.peers);

        info!(
            info_hash = %self.metainfo.info_hash,
            responded = summary.responded,
            seeders = self.seeders,
            leechers = self.leechers,
            peers = self.peers.len(),
            "peer request finished"
        );

        summary.responded
    }
}
