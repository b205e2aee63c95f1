//! # Snapshot Errors
//!
//! Error types for snapshot management and integrity verification.
//! Snapshot errors never terminate the process; a failed rebuild leaves the
//! previous engine state serving.

use thiserror::Error;

use crate::engine::EngineError;

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Snapshot manager errors
#[derive(Debug, Clone, Error)]
pub enum SnapshotError {
    /// A file could not be read
    #[error("Snapshot I/O error at '{path}': {detail}")]
    Io { path: String, detail: String },

    /// The manifest could not be parsed or serialized
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// The mapping declares a manifest file that is not on disk
    #[error("Declared manifest '{0}' is missing")]
    ManifestMissing(String),

    /// Integrity verification was requested but the mapping declares no
    /// manifest
    #[error("No integrity manifest is declared for this catalog")]
    NoManifest,

    /// The rebuild machinery itself failed (not a per-schema skip)
    #[error("Snapshot rebuild failed: {0}")]
    RebuildFailed(String),

    /// The engine was unavailable or rejected a statement
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl SnapshotError {
    pub fn io(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn manifest(detail: impl Into<String>) -> Self {
        Self::Manifest(detail.into())
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            SnapshotError::NoManifest => 400,
            _ => 500,
        }
    }
}
