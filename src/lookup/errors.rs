//! # Lookup Errors
//!
//! Request-fatal lookup failures. Per-group conditions (unknown group,
//! degraded schema) never appear here; they are handled inside the
//! response envelope.

use thiserror::Error;

use crate::engine::EngineError;
use crate::query::CompileError;
use crate::snapshot::SnapshotError;

/// Result type for lookup operations
pub type LookupResult<T> = Result<T, LookupError>;

/// Lookup executor errors
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    /// The pagination window is invalid
    #[error("Invalid pagination: {0}")]
    InvalidPage(String),

    /// A JSON-packed record column came back unparseable
    #[error("Record column '{column}' is not valid JSON: {detail}")]
    RecordParse { column: String, detail: String },

    /// Query compilation failed
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The engine rejected a statement
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The snapshot manager could not make the namespace serve-ready
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl LookupError {
    pub fn invalid_page(detail: impl Into<String>) -> Self {
        Self::InvalidPage(detail.into())
    }

    pub fn record_parse(column: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::RecordParse {
            column: column.into(),
            detail: detail.into(),
        }
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            LookupError::InvalidPage(_) => 400,
            LookupError::RecordParse { .. } => 500,
            LookupError::Compile(e) => e.status_code(),
            LookupError::Engine(_) => 500,
            LookupError::Snapshot(e) => e.status_code(),
        }
    }
}
