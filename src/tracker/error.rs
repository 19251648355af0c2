use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("bencode error: {0}")]
    Bencode(#[from] crate::bencode::BencodeError),

    /// The tracker answered with a `failure reason`.
    #[error("tracker returned error: {0}")]
    Failure(String),

    /// The body decoded as neither the compact nor the dictionary form.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timeout")]
    Timeout,

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// A regular announce was attempted before the tracker's interval elapsed.
    #[error("announce too soon, retry in {0:?}")]
    TooSoon(Duration),
}
