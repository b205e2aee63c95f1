//! SHA-256 checksums for snapshot source files
//!
//! Manifest entries carry algorithm-tagged digests: `sha256:<hex>`.
//! Checksums are recomputed from the files on disk during verification.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use super::errors::{SnapshotError, SnapshotResult};

/// Computes the SHA-256 digest of a byte slice, as lowercase hex
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    to_hex(&hasher.finalize())
}

/// Computes the SHA-256 digest of an entire file, as lowercase hex.
///
/// Reads in 8 KiB chunks so large columnar files never load whole.
pub fn compute_file_checksum(path: &Path) -> SnapshotResult<String> {
    let file = File::open(path)
        .map_err(|e| SnapshotError::io(path.display().to_string(), e.to_string()))?;

    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| SnapshotError::io(path.display().to_string(), e.to_string()))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(to_hex(&hasher.finalize()))
}

/// Formats a hex digest with its algorithm tag: `sha256:<hex>`
pub fn format_checksum(hex: &str) -> String {
    format!("sha256:{hex}")
}

/// Parses a tagged checksum back to its hex digest.
///
/// Returns `None` for a wrong tag, wrong length, or non-hex characters.
pub fn parse_checksum(formatted: &str) -> Option<String> {
    let hex = formatted.strip_prefix("sha256:")?;
    if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(hex.to_ascii_lowercase())
}

fn to_hex(digest: &[u8]) -> String {
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
