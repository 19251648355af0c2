use super::error::MetainfoError;
use super::info_hash::{percent_encode, InfoHash};

/// A `magnet:?` URI carrying an info hash and optional name and trackers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagnetLink {
    pub info_hash: InfoHash,
    pub display_name: Option<String>,
    pub trackers: Vec<String>,
}

impl MagnetLink {
    /// Parses `xt=urn:btih:<hash>` (40 hex or 32 base32 characters) along
    /// with any `dn` and `tr` parameters. Other parameters are ignored.
    pub fn parse(uri: &str) -> Result<Self, MetainfoError> {
        let query = uri.strip_prefix("magnet:?").ok_or_else(|| {
            MetainfoError::InvalidMagnetLink("missing magnet:? prefix".into())
        })?;

        let mut xt = None;
        let mut display_name = None;
        let mut trackers = Vec::new();

        for (key, value) in query.split('&').filter_map(|part| part.split_once('=')) {
            match key {
                "xt" if xt.is_none() => xt = Some(value),
                "dn" if display_name.is_none() => display_name = Some(url_decode(value)),
                "tr" => trackers.push(url_decode(value)),
                _ => {}
            }
        }

        let xt =
            xt.ok_or_else(|| MetainfoError::InvalidMagnetLink("missing xt parameter".into()))?;
        let hash = xt
            .strip_prefix("urn:btih:")
            .ok_or_else(|| MetainfoError::InvalidMagnetLink("unsupported xt format".into()))?;

        let info_hash = match hash.len() {
            40 => InfoHash::from_hex(hash)?,
            32 => {
                let decoded = base32_decode(hash)
                    .ok_or_else(|| MetainfoError::InvalidMagnetLink("invalid base32".into()))?;
                InfoHash::from_bytes(&decoded)?
            }
            _ => {
                return Err(MetainfoError::InvalidMagnetLink(
                    "invalid info hash length".into(),
                ))
            }
        };

        Ok(Self {
            info_hash,
            display_name,
            trackers,
        })
    }

    pub fn to_uri(&self) -> String {
        let mut uri = format!("magnet:?xt=urn:btih:{}", self.info_hash.to_hex());

        if let Some(ref name) = self.display_name {
            uri.push_str("&dn=");
            uri.push_str(&percent_encode(name.as_bytes()));
        }

        for tracker in &self.trackers {
            uri.push_str("&tr=");
            uri.push_str(&percent_encode(tracker.as_bytes()));
        }

        uri
    }
}

fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let decoded = bytes
                    .get(i + 1..i + 3)
                    .filter(|hex| hex.iter().all(u8::is_ascii_hexdigit))
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match decoded {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn base32_decode(input: &str) -> Option<Vec<u8>> {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

    let input = input.to_uppercase();
    let input = input.trim_end_matches('=');

    let mut output = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;

    for c in input.bytes() {
        let value = ALPHABET.iter().position(|&x| x == c)? as u64;
        buffer = (buffer << 5) | value;
        bits_in_buffer += 5;

        if bits_in_buffer >= 8 {
            bits_in_buffer -= 8;
            output.push((buffer >> bits_in_buffer) as u8);
            buffer &= (1 << bits_in_buffer) - 1;
        }
    }

    Some(output)
}
