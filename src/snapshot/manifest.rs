//! Integrity manifest for snapshot source files
//!
//! A manifest maps source-relative file paths to tagged SHA-256
//! checksums. It is published alongside the snapshot files and read
//! back during verification.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::checksum::{compute_file_checksum, format_checksum};
use super::errors::{SnapshotError, SnapshotResult};

/// Manifest describing the expected content of every snapshot file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotManifest {
    /// Relative source path to tagged checksum (`sha256:<hex>`)
    pub hashes: BTreeMap<String, String>,
}

impl SnapshotManifest {
    /// Creates an empty manifest
    pub fn new() -> Self {
        SnapshotManifest {
            hashes: BTreeMap::new(),
        }
    }

    /// Records the checksum of one file under its relative path
    pub fn record(&mut self, relative_path: &str, tagged_checksum: &str) {
        self.hashes
            .insert(relative_path.to_string(), tagged_checksum.to_string());
    }

    /// Returns the expected checksum for a relative path, if covered
    pub fn expected(&self, relative_path: &str) -> Option<&str> {
        self.hashes.get(relative_path).map(|s| s.as_str())
    }

    /// Builds a manifest by hashing each listed file under `root`
    pub fn from_files(root: &Path, relative_paths: &[String]) -> SnapshotResult<Self> {
        let mut manifest = SnapshotManifest::new();
        for relative in relative_paths {
            let hex = compute_file_checksum(&root.join(relative))?;
            manifest.record(relative, &format_checksum(&hex));
        }
        Ok(manifest)
    }

    /// Serializes the manifest to pretty JSON
    pub fn to_json(&self) -> SnapshotResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SnapshotError::Manifest(e.to_string()))
    }

    /// Parses a manifest from JSON
    pub fn from_json(json: &str) -> SnapshotResult<Self> {
        serde_json::from_str(json).map_err(|e| SnapshotError::Manifest(e.to_string()))
    }

    /// Writes the manifest to disk, synced before returning
    pub fn write_to_file(&self, path: &Path) -> SnapshotResult<()> {
        let json = self.to_json()?;
        let mut file = File::create(path)
            .map_err(|e| SnapshotError::io(path.display().to_string(), e.to_string()))?;
        file.write_all(json.as_bytes())
            .map_err(|e| SnapshotError::io(path.display().to_string(), e.to_string()))?;
        file.sync_all()
            .map_err(|e| SnapshotError::io(path.display().to_string(), e.to_string()))?;
        Ok(())
    }

    /// Reads a manifest from disk
    pub fn read_from_file(path: &Path) -> SnapshotResult<Self> {
        let mut file = File::open(path)
            .map_err(|e| SnapshotError::io(path.display().to_string(), e.to_string()))?;
        let mut json = String::new();
        file.read_to_string(&mut json)
            .map_err(|e| SnapshotError::io(path.display().to_string(), e.to_string()))?;
        Self::from_json(&json)
    }
}

impl Default for SnapshotManifest {
    fn default() -> Self {
        Self::new()
    }
}
