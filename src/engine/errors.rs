//! # Engine Errors
//!
//! Error types for the embedded query engine wrapper.

use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Embedded engine errors
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine handle could not be opened or locked
    #[error("Engine unavailable: {0}")]
    Unavailable(String),

    /// A statement was rejected or failed during execution
    #[error("Engine statement failed: {0}")]
    Statement(String),
}

impl EngineError {
    pub fn statement(e: duckdb::Error) -> Self {
        Self::Statement(e.to_string())
    }

    /// True when the failure names a relation the engine does not know.
    ///
    /// This is the drift signal: the catalog expects a table the engine
    /// namespace no longer holds.
    pub fn is_missing_relation(&self) -> bool {
        match self {
            EngineError::Statement(msg) => {
                msg.contains("Catalog Error") && msg.contains("does not exist")
            }
            EngineError::Unavailable(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_relation_classification() {
        let drift = EngineError::Statement(
            "Catalog Error: Table with name vehicles does not exist!".to_string(),
        );
        assert!(drift.is_missing_relation());

        let other = EngineError::Statement("Binder Error: column nope".to_string());
        assert!(!other.is_missing_relation());

        let unavailable = EngineError::Unavailable("poisoned".to_string());
        assert!(!unavailable.is_missing_relation());
    }
}
