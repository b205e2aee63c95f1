//! # Trust Errors
//!
//! Error types for bearer verification and response signing. Every
//! rejection variant maps to the same outward 401; the specific variant
//! exists for logs only, so callers cannot probe which check failed.

use thiserror::Error;

/// Result type for trust operations
pub type TrustResult<T> = Result<T, TrustError>;

/// Trust envelope errors
#[derive(Debug, Clone, Error)]
pub enum TrustError {
    /// The token is structurally invalid or carries unusable claims
    #[error("Malformed bearer token")]
    MalformedToken,

    /// The token's expiry is in the past
    #[error("Bearer token expired")]
    TokenExpired,

    /// The signature does not verify against the configured public key
    #[error("Bearer token signature invalid")]
    InvalidSignature,

    /// A required claim is absent
    #[error("Bearer token missing required claim '{0}'")]
    MissingClaim(String),

    /// Key material could not be read or parsed
    #[error("Failed to load key material from '{path}': {detail}")]
    KeyLoad { path: String, detail: String },

    /// The response envelope could not be signed
    #[error("Response signing failed: {0}")]
    SigningFailed(String),
}

impl TrustError {
    pub fn key_load(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::KeyLoad {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            TrustError::MalformedToken
            | TrustError::TokenExpired
            | TrustError::InvalidSignature
            | TrustError::MissingClaim(_) => 401,
            TrustError::KeyLoad { .. } | TrustError::SigningFailed(_) => 500,
        }
    }
}
