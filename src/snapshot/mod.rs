//! # Snapshot Management
//!
//! The engine namespace is a disposable cache over versioned columnar
//! files. This module rebuilds it from the catalog, tracks readiness and
//! per-schema degradation, and verifies file integrity against a
//! published SHA-256 manifest.

pub mod checksum;
pub mod errors;
pub mod manifest;
mod manager;

pub use errors::{SnapshotError, SnapshotResult};
pub use manager::{CatalogState, IntegrityReport, RebuildReport, SnapshotManager};
pub use manifest::SnapshotManifest;
