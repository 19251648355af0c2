//! Bencode encoding and decoding ([BEP-3]).
//!
//! Bencode is the serialization format used throughout BitTorrent for storing
//! and transmitting structured data, including `.torrent` files and tracker
//! responses.
//!
//! # Data Types
//!
//! | Type | Format | Example |
//! |------|--------|---------|
//! | Integer | `i<number>e` | `i42e` → 42 |
//! | Byte String | `<length>:<data>` | `4:spam` → "spam" |
//! | List | `l<items>e` | `l4:spami42ee` → ["spam", 42] |
//! | Dictionary | `d<key><value>...e` | `d3:foo3:bare` → {"foo": "bar"} |
//!
//! # Typed decoding
//!
//! The codec is driven by `serde`. The destination type decides the
//! expected shape of every value; a wire value of another shape is a
//! [`BencodeError::TypeMismatch`], never a silent coercion.
//!
//! Dictionary keys are matched to record fields after removing spaces and
//! hyphens and lower-casing both sides (see [`normalize`]), so
//! `"creation date"`, `"creation-date"` and `"CreationDate"` all reach a
//! field named `CreationDate`.
//!
//! ```
//! use btcodec::bencode::{decode, encode};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! #[serde(rename_all = "PascalCase")]
//! struct Record {
//!     creation_date: u32,
//!     tags: Vec<String>,
//!     comment: Option<String>,
//! }
//!
//! let record: Record = decode(b"d13:creation datei1700e4:tagsl1:a1:bee").unwrap();
//! assert_eq!(record.creation_date, 1700);
//! assert_eq!(record.tags, ["a", "b"]);
//! assert_eq!(record.comment, None);
//!
//! // Encoding writes field names verbatim, sorted by raw bytes.
//! assert_eq!(
//!     encode(&record).unwrap(),
//!     b"d12:CreationDatei1700e4:Tagsl1:a1:bee"
//! );
//! ```
//!
//! # Dynamic values
//!
//! ```
//! use btcodec::bencode::{decode, encode, Value};
//! use bytes::Bytes;
//! use std::collections::BTreeMap;
//!
//! let value: Value = decode(b"d3:foo3:bare").unwrap();
//! assert_eq!(value.get(b"foo").and_then(Value::as_str), Some("bar"));
//!
//! let mut dict = BTreeMap::new();
//! dict.insert(Bytes::from_static(b"key"), Value::string("value"));
//! assert_eq!(encode(&Value::Dict(dict)).unwrap(), b"d3:key5:valuee");
//! ```
//!
//! # Strictness
//!
//! Decoding is permissive by default. [`DecodeOptions::strict`] rejects
//! leading zeros, `-0`, and unsorted or duplicate dictionary keys.
//! Encoding always produces canonical output.
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

mod decode;
mod encode;
mod error;
mod field;
mod value;

pub use decode::{
    decode, decode_prefix, decode_with, value_len, DecodeOptions, Decoder, UnknownFields,
    DEFAULT_MAX_DEPTH,
};
pub use encode::{encode, encode_to};
pub use error::BencodeError;
pub use field::{normalize, FieldTable};
pub use value::Value;
