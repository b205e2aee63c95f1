//! Outbound response signing
//!
//! When a signing key is configured, the whole response envelope is
//! embedded in an RS256 token under the `envelope` claim with fresh
//! `iat`/`exp`. Callers holding the matching public key can verify the
//! response was produced by this service and has not been altered.

use std::fs;
use std::path::Path;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lookup::ResponseEnvelope;

use super::errors::{TrustError, TrustResult};

/// Claims of a signed response token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedEnvelopeClaims {
    /// The full response envelope, verbatim
    pub envelope: Value,
    /// Issued at (Unix epoch seconds)
    pub iat: i64,
    /// Expiration (Unix epoch seconds)
    pub exp: i64,
}

/// Signs response envelopes with one RSA private key
#[derive(Clone)]
pub struct ResponseSigner {
    encoding_key: EncodingKey,
    ttl_secs: i64,
}

impl std::fmt::Debug for ResponseSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseSigner")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl ResponseSigner {
    /// Load the signer from an RSA private key PEM file
    pub fn from_pem_file(path: &Path, ttl_secs: i64) -> TrustResult<Self> {
        let pem = fs::read(path)
            .map_err(|e| TrustError::key_load(path.display().to_string(), e.to_string()))?;
        let encoding_key = EncodingKey::from_rsa_pem(&pem)
            .map_err(|e| TrustError::key_load(path.display().to_string(), e.to_string()))?;
        Ok(Self {
            encoding_key,
            ttl_secs,
        })
    }

    /// Build the signer from PEM bytes already in memory
    pub fn from_pem(pem: &[u8], ttl_secs: i64) -> TrustResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(pem)
            .map_err(|e| TrustError::key_load("signing key pem", e.to_string()))?;
        Ok(Self {
            encoding_key,
            ttl_secs,
        })
    }

    /// Wrap one envelope in a signed token with fresh time claims
    pub fn sign(&self, envelope: &ResponseEnvelope) -> TrustResult<String> {
        let now = Utc::now().timestamp();
        let claims = SignedEnvelopeClaims {
            envelope: serde_json::to_value(envelope)
                .map_err(|e| TrustError::SigningFailed(e.to_string()))?,
            iat: now,
            exp: now + self.ttl_secs,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| TrustError::SigningFailed(e.to_string()))
    }
}
