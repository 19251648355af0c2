use std::fmt::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use btcodec::bencode::{decode_with, DecodeOptions, Value};
use btcodec::config::ClientConfig;
use btcodec::constants::DEFAULT_PORT;
use btcodec::metainfo::Metainfo;
use btcodec::torrent::Torrent;
use btcodec::tracker::TrackerEvent;
use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Byte strings longer than this are summarized in dumps.
const DUMP_BYTES_LIMIT: usize = 64;

#[derive(Debug, Parser)]
#[command(name = "btcodec", version, about = "Inspect torrents and bencode documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a summary of a .torrent file
    Info { torrent: PathBuf },
    /// Announce a .torrent file to all of its HTTP trackers
    Announce {
        torrent: PathBuf,
        /// Port reported to the trackers
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Print the structure of any bencode document
    Decode {
        file: PathBuf,
        /// Reject non-canonical encodings
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Metainfo(#[from] btcodec::MetainfoError),
    #[error("{0}")]
    Bencode(#[from] btcodec::BencodeError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Fmt(#[from] fmt::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Info { torrent } => {
            let metainfo = Metainfo::from_file(torrent)?;
            print!("{}", metainfo);
        }
        Command::Announce { torrent, port } => {
            let metainfo = Metainfo::from_file(torrent)?;
            let config = ClientConfig::default().with_port(port);
            let mut torrent = Torrent::new(metainfo, config);

            torrent.request_peers(TrackerEvent::Started).await;

            println!("Seeders: {}", torrent.seeders());
            println!("Leechers: {}", torrent.leechers());
            println!("Peers: {}", torrent.peers().len());
            print!("{}", torrent.peers());
        }
        Command::Decode { file, strict } => {
            let data = std::fs::read(file)?;
            let options = if strict {
                DecodeOptions::strict()
            } else {
                DecodeOptions::default()
            };
            let value: Value = decode_with(&data, &options)?;

            let mut out = String::new();
            dump(&value, 0, &mut out)?;
            print!("{}", out);
        }
    }
    Ok(())
}

fn dump(value: &Value, indent: usize, out: &mut impl Write) -> fmt::Result {
    let pad = "  ".repeat(indent);
    match value {
        Value::Integer(i) => writeln!(out, "{}{}", pad, i),
        Value::Bytes(bytes) => writeln!(out, "{}{}", pad, RenderBytes(bytes)),
        Value::List(items) => {
            writeln!(out, "{}[", pad)?;
            for item in items {
                dump(item, indent + 1, out)?;
            }
            writeln!(out, "{}]", pad)
        }
        Value::Dict(entries) => {
            writeln!(out, "{}{{", pad)?;
            for (key, item) in entries {
                writeln!(out, "{}  {}:", pad, RenderBytes(key))?;
                dump(item, indent + 2, out)?;
            }
            writeln!(out, "{}}}", pad)
        }
    }
}

/// Printable form of a byte string: quoted text, hex, or a length summary.
struct RenderBytes<'a>(&'a [u8]);

impl fmt::Display for RenderBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(self.0) {
            Ok(s) if !s.chars().any(char::is_control) => write!(f, "{:?}", s),
            _ if self.0.len() > DUMP_BYTES_LIMIT => write!(f, "<{} bytes>", self.0.len()),
            _ => {
                f.write_str("0x")?;
                self.0.iter().try_for_each(|b| write!(f, "{:02x}", b))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btcodec::bencode::decode;

    #[test]
    fn test_dump_renders_nested_values() {
        let value: Value = decode(b"d4:listli1e2:\x00\x01e4:name3:fooe").unwrap();
        let mut out = String::new();
        dump(&value, 0, &mut out).unwrap();
        assert_eq!(
            out,
            "{\n  \"list\":\n    [\n      1\n      0x0001\n    ]\n  \"name\":\n    \"foo\"\n}\n"
        );
    }

    #[test]
    fn test_render_bytes_summarizes_long_binary() {
        let bytes = vec![0u8; DUMP_BYTES_LIMIT + 1];
        assert_eq!(
            RenderBytes(&bytes).to_string(),
            format!("<{} bytes>", DUMP_BYTES_LIMIT + 1)
        );
    }
}
