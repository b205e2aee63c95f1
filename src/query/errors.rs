//! # Compile Errors
//!
//! Error types for query compilation.

use thiserror::Error;

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;

/// Query compilation errors
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    /// A name failed the identifier grammar at the interpolation boundary
    #[error("Unsafe identifier '{0}' rejected at compile")]
    UnsafeIdentifier(String),

    /// A subject value is not a scalar (string, number, boolean)
    #[error("Subject field '{0}' must carry a scalar value")]
    NonScalarSubject(String),
}

impl CompileError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            // Identifier failures can only come from a defective catalog
            CompileError::UnsafeIdentifier(_) => 500,
            CompileError::NonScalarSubject(_) => 400,
        }
    }
}
