//! # Lookup Executor
//!
//! Runs compiled group queries against the engine and assembles the
//! response envelope. Per-group conditions stay inside the envelope:
//! unknown groups are skipped, degraded schemas produce an error entry.
//! Only request-level problems (bad pagination, engine failure) fail the
//! whole lookup.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::catalog::{GroupDefinition, MappingCatalog};
use crate::engine::{Engine, RowSet};
use crate::observability::Logger;
use crate::query::{
    compile, count_statement, paged_statement, CompiledQuery, FilterMode, ParamValue,
};
use crate::snapshot::SnapshotManager;

use super::errors::{LookupError, LookupResult};
use super::normalize::rows_to_json;
use super::response::{GroupData, ResponseEnvelope};

/// Page size applied when a request paginates without naming one
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// One lookup request body
#[derive(Debug, Clone, Deserialize)]
pub struct LookupRequest {
    /// Echoed in the envelope; the configured default applies when absent
    #[serde(default)]
    pub source_id: Option<String>,
    /// Filter field name -> scalar value
    #[serde(default)]
    pub subject: Map<String, Value>,
    /// Group names to resolve
    pub requested_fields: Vec<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

/// Validated pagination window
#[derive(Debug, Clone, Copy)]
struct PageWindow {
    page: u32,
    page_size: u32,
}

impl PageWindow {
    /// None when the request asks for a flat list
    fn from_request(request: &LookupRequest) -> LookupResult<Option<Self>> {
        if request.page.is_none() && request.page_size.is_none() {
            return Ok(None);
        }
        let page = request.page.unwrap_or(1);
        let page_size = request.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page == 0 {
            return Err(LookupError::invalid_page("page must be >= 1"));
        }
        if page_size == 0 {
            return Err(LookupError::invalid_page("page_size must be >= 1"));
        }
        Ok(Some(Self { page, page_size }))
    }

    fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }
}

/// Runs lookups for one catalog against one engine
pub struct LookupExecutor {
    catalog: Arc<MappingCatalog>,
    engine: Arc<Engine>,
    snapshots: Arc<SnapshotManager>,
}

impl LookupExecutor {
    pub fn new(
        catalog: Arc<MappingCatalog>,
        engine: Arc<Engine>,
        snapshots: Arc<SnapshotManager>,
    ) -> Self {
        Self {
            catalog,
            engine,
            snapshots,
        }
    }

    /// Run one lookup request end to end
    pub fn run(
        &self,
        request: &LookupRequest,
        default_source_id: &str,
    ) -> LookupResult<ResponseEnvelope> {
        let started = Instant::now();
        let request_id = Uuid::new_v4().to_string();
        let window = PageWindow::from_request(request)?;

        self.snapshots.ensure_ready()?;

        let mut data = BTreeMap::new();
        for group_name in &request.requested_fields {
            let Some(group) = self.catalog.group(group_name) else {
                Logger::warn(
                    "LOOKUP_GROUP_UNKNOWN",
                    &[("group", group_name.as_str()), ("request_id", &request_id)],
                );
                continue;
            };
            let group_data = self.run_group(group, &request.subject, window)?;
            data.insert(group_name.clone(), group_data);
        }

        let source_id = request
            .source_id
            .clone()
            .unwrap_or_else(|| default_source_id.to_string());
        let latency_ms = started.elapsed().as_millis() as u64;
        Logger::info(
            "LOOKUP_COMPLETED",
            &[
                ("groups", &data.len().to_string()),
                ("latency_ms", &latency_ms.to_string()),
                ("request_id", &request_id),
                ("source_id", &source_id),
            ],
        );
        Ok(ResponseEnvelope::new(source_id, latency_ms, data))
    }

    fn run_group(
        &self,
        group: &GroupDefinition,
        subject: &Map<String, Value>,
        window: Option<PageWindow>,
    ) -> LookupResult<GroupData> {
        let compiled = compile(&self.catalog, group, subject, FilterMode::FuzzyAll)?;

        for source in &compiled.sources {
            if self.snapshots.is_degraded(source) {
                Logger::warn(
                    "LOOKUP_GROUP_DEGRADED",
                    &[("group", &group.name), ("schema", source)],
                );
                return Ok(GroupData::Error {
                    error: format!("schema unavailable: {source}"),
                });
            }
        }

        match window {
            None => {
                let (names, rows) = self.query_with_drift_retry(&compiled.sql, &compiled.params)?;
                let results = rows_to_json(&names, rows, &compiled.record_columns)?;
                Ok(GroupData::Rows(results))
            }
            Some(w) => self.run_paged(&compiled, w),
        }
    }

    fn run_paged(&self, compiled: &CompiledQuery, window: PageWindow) -> LookupResult<GroupData> {
        let total = self.count_with_drift_retry(&count_statement(compiled), &compiled.params)?;
        let offset = window.offset();

        let sql = paged_statement(compiled, window.page_size, offset);
        let (names, rows) = self.query_with_drift_retry(&sql, &compiled.params)?;
        let results = rows_to_json(&names, rows, &compiled.record_columns)?;

        let total_rows = u64::try_from(total).unwrap_or(0);
        Ok(GroupData::Page {
            total,
            page: window.page,
            page_size: window.page_size,
            has_next: offset + (window.page_size as u64) < total_rows,
            results,
        })
    }

    /// Run a statement, rebuilding once when a target table is missing.
    ///
    /// Covers drift that appears between the readiness check and execution.
    /// A second failure propagates.
    fn query_with_drift_retry(&self, sql: &str, params: &[ParamValue]) -> LookupResult<RowSet> {
        match self.engine.query_rows(sql, params) {
            Err(e) if e.is_missing_relation() => {
                Logger::warn("LOOKUP_DRIFT_RETRY", &[("detail", &e.to_string())]);
                self.snapshots.rebuild()?;
                Ok(self.engine.query_rows(sql, params)?)
            }
            other => Ok(other?),
        }
    }

    fn count_with_drift_retry(&self, sql: &str, params: &[ParamValue]) -> LookupResult<i64> {
        match self.engine.query_count(sql, params) {
            Err(e) if e.is_missing_relation() => {
                Logger::warn("LOOKUP_DRIFT_RETRY", &[("detail", &e.to_string())]);
                self.snapshots.rebuild()?;
                Ok(self.engine.query_count(sql, params)?)
            }
            other => Ok(other?),
        }
    }
}
