//! Torrent metainfo handling ([BEP-3], [BEP-9], [BEP-12]).
//!
//! A torrent file (`.torrent`) contains metadata about the files to be
//! shared: names and sizes, piece hashes for integrity checks, and tracker
//! URLs for peer discovery. [`Metainfo`] is decoded straight from the file
//! through the bencode codec; [`MagnetLink`] carries only an info hash and
//! optional hints.
//!
//! # Examples
//!
//! ## Parsing a torrent file
//!
//! ```no_run
//! use btcodec::metainfo::Metainfo;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let torrent = Metainfo::from_file("example.torrent")?;
//!
//! println!("Name: {}", torrent.info.name);
//! println!("Info hash: {}", torrent.info_hash);
//! println!("Total size: {} bytes", torrent.total_length());
//! println!("Number of pieces: {}", torrent.piece_count());
//!
//! for tracker in torrent.trackers() {
//!     println!("Tracker: {}", tracker);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Parsing a magnet link
//!
//! ```
//! use btcodec::metainfo::MagnetLink;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let magnet = MagnetLink::parse(
//!     "magnet:?xt=urn:btih:c12fe1c06bba254a9dc9f519b335aa7c1367a88a\
//!      &dn=Example%20File&tr=http%3A%2F%2Ftracker.example.com%2Fannounce"
//! )?;
//!
//! assert_eq!(magnet.display_name.as_deref(), Some("Example File"));
//! assert_eq!(magnet.trackers, ["http://tracker.example.com/announce"]);
//! # Ok(())
//! # }
//! ```
//!
//! # Torrent Structure
//!
//! - **info** - Core torrent metadata (hashed to create the info hash)
//!   - `name` - Suggested file/directory name
//!   - `piece length` - Size of each piece in bytes
//!   - `pieces` - Concatenated SHA1 hashes of each piece
//!   - `length` - Total size (single-file) OR `files` list (multi-file)
//! - **announce** - Primary tracker URL
//! - **announce-list** - Additional tracker tiers (BEP-12)
//! - **creation date** - Unix timestamp when created
//! - **comment**, **created by**, **encoding** - Optional descriptive fields
//! - **url-list** / **httpseeds** - Web seeds
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html
//! [BEP-9]: http://bittorrent.org/beps/bep_0009.html
//! [BEP-12]: http://bittorrent.org/beps/bep_0012.html

mod error;
mod info_hash;
mod magnet;
mod torrent;

pub use error::MetainfoError;
pub use info_hash::{percent_encode, InfoHash};
pub use magnet::MagnetLink;
pub use torrent::{File, Info, Metainfo, PIECE_HASH_LEN};
