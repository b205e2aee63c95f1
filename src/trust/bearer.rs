//! Inbound bearer token verification
//!
//! Tokens are RS256-signed by an external issuer and verified against a
//! configured RSA public key. `exp` and `iat` are required claims; a token
//! missing either never verifies. Verification is stateless.

use std::fs;
use std::path::Path;

use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use super::errors::{TrustError, TrustResult};

/// Claims carried by an inbound bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BearerClaims {
    /// Expiration (Unix epoch seconds)
    pub exp: i64,
    /// Issued at (Unix epoch seconds)
    pub iat: i64,
    /// Optional caller identity, carried into logs
    #[serde(default)]
    pub sub: Option<String>,
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn token_from_header(value: &str) -> TrustResult<&str> {
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(TrustError::MalformedToken)
}

/// Verifies inbound bearer tokens against one RSA public key
#[derive(Clone)]
pub struct BearerVerifier {
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for BearerVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerVerifier").finish_non_exhaustive()
    }
}

impl BearerVerifier {
    /// Load the verifier from an RSA public key PEM file
    pub fn from_pem_file(path: &Path) -> TrustResult<Self> {
        let pem = fs::read(path)
            .map_err(|e| TrustError::key_load(path.display().to_string(), e.to_string()))?;
        let decoding_key = DecodingKey::from_rsa_pem(&pem)
            .map_err(|e| TrustError::key_load(path.display().to_string(), e.to_string()))?;
        Ok(Self { decoding_key })
    }

    /// Build the verifier from PEM bytes already in memory
    pub fn from_pem(pem: &[u8]) -> TrustResult<Self> {
        let decoding_key = DecodingKey::from_rsa_pem(pem)
            .map_err(|e| TrustError::key_load("public key pem", e.to_string()))?;
        Ok(Self { decoding_key })
    }

    /// Validate one token and extract its claims.
    ///
    /// Expiry, signature, and claim-shape failures are distinct variants
    /// here; the route layer collapses them into one 401.
    pub fn verify(&self, token: &str) -> TrustResult<BearerClaims> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp"]);
        validation.validate_aud = false;

        let data = decode::<BearerClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TrustError::TokenExpired,
                ErrorKind::InvalidSignature => TrustError::InvalidSignature,
                ErrorKind::MissingRequiredClaim(claim) => TrustError::MissingClaim(claim.clone()),
                _ => TrustError::MalformedToken,
            }
        })?;
        Ok(data.claims)
    }
}
