use thiserror::Error;

use crate::bencode::BencodeError;

/// Errors that can occur when loading torrent files or parsing magnet links.
#[derive(Debug, Error)]
pub enum MetainfoError {
    /// The torrent file is not valid bencode for the metainfo layout.
    #[error("bencode error: {0}")]
    Bencode(#[from] BencodeError),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A field decoded but holds an unusable value.
    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    #[error("invalid info hash length")]
    InvalidInfoHashLength,

    #[error("invalid magnet link: {0}")]
    InvalidMagnetLink(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
