//! # Snapshot Manager
//!
//! Owns the lifecycle of the engine namespace: rebuilds tables from the
//! catalog's source files, tracks per-schema degradation, detects drift
//! between the catalog and the engine, and verifies source files against
//! the integrity manifest.
//!
//! Rebuilds are serialized. A missing or unreadable source file degrades
//! that one schema; every other schema still loads.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;

use crate::catalog::MappingCatalog;
use crate::engine::{Engine, EngineError};
use crate::observability::Logger;

use super::checksum::{compute_file_checksum, parse_checksum};
use super::errors::{SnapshotError, SnapshotResult};
use super::manifest::SnapshotManifest;

/// Lifecycle state of the engine namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogState {
    /// No rebuild has run yet
    Uninitialized,
    /// A rebuild is in progress
    Rebuilding,
    /// Every declared schema is loaded
    Ready,
    /// At least one schema failed to load; the rest are serving
    Degraded,
}

impl CatalogState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogState::Uninitialized => "uninitialized",
            CatalogState::Rebuilding => "rebuilding",
            CatalogState::Ready => "ready",
            CatalogState::Degraded => "degraded",
        }
    }
}

/// Outcome of one rebuild pass
#[derive(Debug, Clone)]
pub struct RebuildReport {
    /// Schemas loaded into the engine, in name order
    pub loaded: Vec<String>,
    /// Schemas skipped, with the reason each was skipped
    pub skipped: Vec<(String, String)>,
}

/// Outcome of verifying source files against the manifest
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    /// True when every covered file matched its expected checksum
    pub ok: bool,
    /// Number of files whose checksum was computed and compared
    pub checked: usize,
    /// Relative path of the first file that failed, when any did
    pub first_mismatch: Option<String>,
    /// Human-readable outcome
    pub message: String,
}

impl IntegrityReport {
    fn mismatch(checked: usize, file: &str, message: String) -> Self {
        Self {
            ok: false,
            checked,
            first_mismatch: Some(file.to_string()),
            message,
        }
    }
}

/// Manages the engine namespace for one catalog
pub struct SnapshotManager {
    catalog: Arc<MappingCatalog>,
    engine: Arc<Engine>,
    state: RwLock<CatalogState>,
    degraded: RwLock<BTreeMap<String, String>>,
    rebuild_lock: Mutex<()>,
}

impl SnapshotManager {
    pub fn new(catalog: Arc<MappingCatalog>, engine: Arc<Engine>) -> Self {
        Self {
            catalog,
            engine,
            state: RwLock::new(CatalogState::Uninitialized),
            degraded: RwLock::new(BTreeMap::new()),
            rebuild_lock: Mutex::new(()),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> CatalogState {
        *self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn set_state(&self, next: CatalogState) {
        *self.state.write().unwrap_or_else(|p| p.into_inner()) = next;
    }

    /// Schemas that failed their last load attempt, with reasons
    pub fn degraded_schemas(&self) -> BTreeMap<String, String> {
        self.degraded
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// True when the schema failed its last load attempt
    pub fn is_degraded(&self, schema: &str) -> bool {
        self.degraded
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .contains_key(schema)
    }

    /// Rebuild the engine namespace from the catalog's source files.
    ///
    /// Rebuilds serialize behind a lock; a second caller waits, then runs
    /// its own pass over whatever is on disk by then. A schema whose file
    /// is missing or unreadable is dropped from the engine and recorded as
    /// degraded. Engine unavailability aborts the pass.
    pub fn rebuild(&self) -> SnapshotResult<RebuildReport> {
        let _serial = self.rebuild_lock.lock().unwrap_or_else(|p| p.into_inner());
        self.set_state(CatalogState::Rebuilding);

        match self.run_rebuild() {
            Ok(report) => {
                let next = if report.skipped.is_empty() {
                    CatalogState::Ready
                } else {
                    CatalogState::Degraded
                };
                self.set_state(next);
                Logger::info(
                    "SNAPSHOT_REBUILD_COMPLETE",
                    &[
                        ("loaded", &report.loaded.len().to_string()),
                        ("skipped", &report.skipped.len().to_string()),
                        ("state", next.as_str()),
                    ],
                );
                Ok(report)
            }
            Err(e) => {
                self.set_state(CatalogState::Degraded);
                Logger::error("SNAPSHOT_REBUILD_FAILED", &[("detail", &e.to_string())]);
                Err(e)
            }
        }
    }

    fn run_rebuild(&self) -> SnapshotResult<RebuildReport> {
        let mut loaded = Vec::new();
        let mut skipped: Vec<(String, String)> = Vec::new();

        for schema in self.catalog.schemas() {
            let source = self.catalog.source_path(schema);
            if !source.exists() {
                let reason = format!("source file missing: {}", source.display());
                Logger::warn(
                    "SNAPSHOT_SCHEMA_SKIPPED",
                    &[("reason", &reason), ("schema", &schema.name)],
                );
                self.engine.drop_table(&schema.name)?;
                skipped.push((schema.name.clone(), reason));
                continue;
            }

            match self.engine.load_table(&schema.name, schema.format, &source) {
                Ok(()) => loaded.push(schema.name.clone()),
                Err(EngineError::Statement(detail)) => {
                    let reason = format!("load failed: {detail}");
                    Logger::warn(
                        "SNAPSHOT_SCHEMA_SKIPPED",
                        &[("reason", &reason), ("schema", &schema.name)],
                    );
                    self.engine.drop_table(&schema.name)?;
                    skipped.push((schema.name.clone(), reason));
                }
                Err(e @ EngineError::Unavailable(_)) => return Err(e.into()),
            }
        }

        let mut degraded = self.degraded.write().unwrap_or_else(|p| p.into_inner());
        degraded.clear();
        for (schema, reason) in &skipped {
            degraded.insert(schema.clone(), reason.clone());
        }

        Ok(RebuildReport { loaded, skipped })
    }

    /// Make the engine namespace serve-ready before a lookup runs.
    ///
    /// The first call triggers the initial rebuild. Later calls compare the
    /// engine's tables against the catalog: an expected table that vanished
    /// (external drift) triggers a full rebuild. Schemas already marked
    /// degraded are not treated as drift, so a persistently broken file
    /// does not force a rebuild per request.
    pub fn ensure_ready(&self) -> SnapshotResult<()> {
        if self.state() == CatalogState::Uninitialized {
            self.rebuild()?;
            return Ok(());
        }

        let present: BTreeSet<String> = self.engine.table_names()?.into_iter().collect();
        let degraded = self.degraded_schemas();
        let missing: Vec<&str> = self
            .catalog
            .schema_names()
            .filter(|name| !present.contains(*name) && !degraded.contains_key(*name))
            .collect();

        if !missing.is_empty() {
            Logger::warn(
                "SNAPSHOT_DRIFT_DETECTED",
                &[("missing", &missing.join(","))],
            );
            self.rebuild()?;
        }
        Ok(())
    }

    /// Verify every covered source file against the declared manifest.
    ///
    /// Files the manifest does not cover are not checked. A covered file
    /// that is missing counts as a mismatch. Stops at the first mismatch
    /// and names the file.
    pub fn verify_integrity(&self) -> SnapshotResult<IntegrityReport> {
        let manifest_path = self
            .catalog
            .manifest_path()
            .ok_or(SnapshotError::NoManifest)?;
        if !manifest_path.exists() {
            return Err(SnapshotError::ManifestMissing(
                manifest_path.display().to_string(),
            ));
        }
        let manifest = SnapshotManifest::read_from_file(&manifest_path)?;

        let report = self.check_against(&manifest)?;
        Logger::info(
            "INTEGRITY_CHECKED",
            &[
                ("checked", &report.checked.to_string()),
                ("status", if report.ok { "pass" } else { "fail" }),
            ],
        );
        Ok(report)
    }

    /// Compare every covered source file against the manifest entries
    fn check_against(&self, manifest: &SnapshotManifest) -> SnapshotResult<IntegrityReport> {
        let mut checked = 0usize;
        for schema in self.catalog.schemas() {
            let Some(expected) = manifest.expected(&schema.path) else {
                continue;
            };
            let Some(expected_hex) = parse_checksum(expected) else {
                return Ok(IntegrityReport::mismatch(
                    checked,
                    &schema.path,
                    format!("malformed manifest entry '{expected}'"),
                ));
            };

            let source = self.catalog.source_path(schema);
            if !source.exists() {
                return Ok(IntegrityReport::mismatch(
                    checked,
                    &schema.path,
                    "source file missing".to_string(),
                ));
            }

            let actual_hex = compute_file_checksum(&source)?;
            checked += 1;
            if actual_hex != expected_hex {
                return Ok(IntegrityReport::mismatch(
                    checked,
                    &schema.path,
                    format!(
                        "checksum mismatch: expected sha256:{expected_hex}, found sha256:{actual_hex}"
                    ),
                ));
            }
        }

        Ok(IntegrityReport {
            ok: true,
            checked,
            first_mismatch: None,
            message: format!("{checked} file(s) verified"),
        })
    }
}
