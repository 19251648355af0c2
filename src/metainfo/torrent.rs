use super::error::MetainfoError;
use super::info_hash::InfoHash;
use crate::bencode::{decode_prefix, decode_with, value_len, DecodeOptions, FieldTable};
use bytes::Bytes;
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Length of one SHA-1 piece hash inside `pieces`.
pub const PIECE_HASH_LEN: usize = 20;

/// A file entry of a multi-file torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub length: u64,
    pub md5sum: Option<String>,
    /// Path components relative to the torrent's root directory.
    pub path: Vec<String>,
}

impl File {
    pub fn relative_path(&self) -> PathBuf {
        self.path.iter().collect()
    }
}

/// The `info` dictionary. Its exact encoded bytes determine the info hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    #[serde(rename = "piece length")]
    pub piece_length: u64,
    /// Concatenated 20-byte SHA-1 hashes, one per piece.
    pub pieces: Bytes,
    #[serde(default, skip_serializing_if = "is_false")]
    pub private: bool,
    pub name: String,
    /// Present for single-file torrents.
    pub length: Option<u64>,
    pub md5sum: Option<String>,
    /// Present for multi-file torrents.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<File>,
}

impl Info {
    pub fn total_length(&self) -> u64 {
        self.length
            .unwrap_or_else(|| self.files.iter().map(|f| f.length).sum())
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len() / PIECE_HASH_LEN
    }

    pub fn piece_hash(&self, index: usize) -> Option<[u8; 20]> {
        let start = index.checked_mul(PIECE_HASH_LEN)?;
        self.pieces.get(start..start + PIECE_HASH_LEN)?.try_into().ok()
    }

    pub fn is_multi_file(&self) -> bool {
        self.length.is_none()
    }

    fn validate(&self) -> Result<(), MetainfoError> {
        if self.piece_length == 0 {
            return Err(MetainfoError::InvalidField("piece length"));
        }
        if self.pieces.len() % PIECE_HASH_LEN != 0 {
            return Err(MetainfoError::InvalidField("pieces"));
        }
        if self.length.is_none() && self.files.is_empty() {
            return Err(MetainfoError::MissingField("length or files"));
        }
        if self.files.iter().any(|f| f.path.is_empty()) {
            return Err(MetainfoError::InvalidField("path"));
        }
        Ok(())
    }
}

/// A parsed `.torrent` file.
///
/// # Examples
///
/// ```
/// use btcodec::metainfo::Metainfo;
///
/// let data = b"d8:announce19:http://t.example/an4:infod6:lengthi5e4:name5:hello\
///              12:piece lengthi16384e6:pieces20:aaaaaaaaaaaaaaaaaaaaee";
/// let torrent = Metainfo::from_bytes(data).unwrap();
///
/// assert_eq!(torrent.info.name, "hello");
/// assert_eq!(torrent.total_length(), 5);
/// assert_eq!(torrent.trackers(), ["http://t.example/an"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metainfo {
    pub info: Info,
    pub announce: Option<String>,
    /// Tracker tiers; a flat list of URLs is read as one URL per tier.
    #[serde(
        rename = "announce-list",
        default,
        deserialize_with = "tiers",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub announce_list: Vec<Vec<String>>,
    /// Seconds since the Unix epoch.
    #[serde(rename = "creation date")]
    pub creation_date: Option<i64>,
    pub comment: Option<String>,
    #[serde(rename = "created by")]
    pub created_by: Option<String>,
    pub encoding: Option<String>,
    #[serde(
        rename = "url-list",
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub url_list: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub httpseeds: Vec<String>,
    #[serde(skip)]
    pub info_hash: InfoHash,
    #[serde(skip)]
    raw_info: Bytes,
}

impl Metainfo {
    /// Decodes a torrent file and hashes its `info` dictionary.
    ///
    /// Unknown keys are skipped so that files carrying client-specific
    /// extensions still load. The info hash is taken over the input bytes
    /// of the `info` value, not over a re-encoding.
    pub fn from_bytes(data: &[u8]) -> Result<Self, MetainfoError> {
        let options = DecodeOptions::default().ignore_unknown_fields();
        let mut metainfo: Metainfo = decode_with(data, &options)?;
        metainfo.info.validate()?;

        let span = info_span(data)?;
        metainfo.info_hash = InfoHash::of(&data[span.clone()]);
        metainfo.raw_info = Bytes::copy_from_slice(&data[span]);

        Ok(metainfo)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MetainfoError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// The bencoded `info` dictionary as it appeared in the input.
    pub fn raw_info(&self) -> &Bytes {
        &self.raw_info
    }

    pub fn total_length(&self) -> u64 {
        self.info.total_length()
    }

    pub fn piece_count(&self) -> usize {
        self.info.piece_count()
    }

    pub fn piece_hash(&self, index: usize) -> Option<[u8; 20]> {
        self.info.piece_hash(index)
    }

    /// Returns all tracker URLs from both `announce` and `announce-list`.
    ///
    /// The primary tracker comes first, followed by the tiers in order.
    /// Duplicates are removed.
    pub fn trackers(&self) -> Vec<String> {
        let mut trackers: Vec<String> = Vec::new();

        let all = self.announce.iter().chain(self.announce_list.iter().flatten());
        for tracker in all {
            if !tracker.is_empty() && !trackers.contains(tracker) {
                trackers.push(tracker.clone());
            }
        }

        trackers
    }

    /// Web seed URLs from `url-list` and `httpseeds`.
    pub fn web_seeds(&self) -> impl Iterator<Item = &String> {
        self.url_list.iter().chain(self.httpseeds.iter())
    }
}

impl fmt::Display for Metainfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name:          {}", self.info.name)?;
        writeln!(f, "Info hash:     {}", self.info_hash)?;
        writeln!(f, "Total size:    {} bytes", self.total_length())?;
        writeln!(f, "Piece length:  {} bytes", self.info.piece_length)?;
        writeln!(f, "Pieces:        {}", self.piece_count())?;
        writeln!(f, "Private:       {}", self.info.private)?;

        if let Some(date) = self.creation_date {
            writeln!(f, "Created:       {} (unix)", date)?;
        }
        if let Some(ref created_by) = self.created_by {
            writeln!(f, "Created by:    {}", created_by)?;
        }
        if let Some(ref comment) = self.comment {
            writeln!(f, "Comment:       {}", comment)?;
        }
        if let Some(ref encoding) = self.encoding {
            writeln!(f, "Encoding:      {}", encoding)?;
        }

        writeln!(f, "Trackers:")?;
        for tracker in self.trackers() {
            writeln!(f, "  {}", tracker)?;
        }

        let seeds: Vec<&String> = self.web_seeds().collect();
        if !seeds.is_empty() {
            writeln!(f, "Web seeds:")?;
            for seed in seeds {
                writeln!(f, "  {}", seed)?;
            }
        }

        if self.info.is_multi_file() {
            writeln!(f, "Files:")?;
            for file in &self.info.files {
                writeln!(f, "  {} ({} bytes)", file.relative_path().display(), file.length)?;
            }
        }

        Ok(())
    }
}

/// Finds the byte range of the top-level `info` value.
fn info_span(data: &[u8]) -> Result<Range<usize>, MetainfoError> {
    if data.first() != Some(&b'd') {
        return Err(MetainfoError::InvalidField("metainfo"));
    }

    let info_key = FieldTable::new(&["info"]);
    let mut pos = 1;

    while data.get(pos).is_some_and(|&b| b != b'e') {
        let (key, key_len) = decode_prefix::<&[u8]>(&data[pos..])?;
        pos += key_len;
        let len = value_len(&data[pos..])?;

        if info_key.resolve(key).is_some() {
            return Ok(pos..pos + len);
        }
        pos += len;
    }

    Err(MetainfoError::MissingField("info"))
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn tiers<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<String>>, D::Error> {
    let tiers: Vec<OneOrMany> = Vec::deserialize(deserializer)?;
    Ok(tiers
        .into_iter()
        .map(|tier| tier.0)
        .filter(|tier| !tier.is_empty())
        .collect())
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    OneOrMany::deserialize(deserializer).map(|urls| urls.0)
}

/// A single string or a list of strings.
struct OneOrMany(Vec<String>);

impl<'de> Deserialize<'de> for OneOrMany {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(OneOrManyVisitor)
    }
}

struct OneOrManyVisitor;

impl<'de> Visitor<'de> for OneOrManyVisitor {
    type Value = OneOrMany;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or a list of strings")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<OneOrMany, E> {
        Ok(OneOrMany(vec![v.to_owned()]))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<OneOrMany, E> {
        std::str::from_utf8(v)
            .map(|s| OneOrMany(vec![s.to_owned()]))
            .map_err(|_| E::invalid_value(de::Unexpected::Bytes(v), &self))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<OneOrMany, A::Error> {
        let mut urls = Vec::new();
        while let Some(url) = seq.next_element::<String>()? {
            urls.push(url);
        }
        Ok(OneOrMany(urls))
    }
}
