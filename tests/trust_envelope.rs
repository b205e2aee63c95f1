//! Trust Envelope Tests
//!
//! The bearer gate and response signing as callers experience them:
//! - expired, forged, and malformed tokens are all rejected alike
//! - a valid token admits a lookup that answers normally
//! - a signed response token carries the envelope verbatim

use std::path::Path;
use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::json;
use tempfile::TempDir;

use snapgate::catalog::MappingCatalog;
use snapgate::engine::Engine;
use snapgate::lookup::{LookupExecutor, LookupRequest};
use snapgate::snapshot::SnapshotManager;
use snapgate::trust::{
    token_from_header, BearerClaims, BearerVerifier, ResponseSigner, SignedEnvelopeClaims,
    TrustError,
};

const TEST_PRIVATE_PEM: &str = include_str!("fixtures/test_private.pem");
const TEST_PUBLIC_PEM: &str = include_str!("fixtures/test_public.pem");
const OTHER_PRIVATE_PEM: &str = include_str!("fixtures/other_private.pem");

// =============================================================================
// Test Utilities
// =============================================================================

fn token_with(private_pem: &str, iat: i64, exp: i64) -> String {
    let claims = BearerClaims {
        exp,
        iat,
        sub: Some("caller".to_string()),
    };
    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).unwrap();
    encode(&Header::new(Algorithm::RS256), &claims, &key).unwrap()
}

fn fresh_token(private_pem: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    token_with(private_pem, now, now + 3600)
}

fn verifier() -> BearerVerifier {
    BearerVerifier::from_pem(TEST_PUBLIC_PEM.as_bytes()).unwrap()
}

fn build_executor(root: &Path) -> LookupExecutor {
    let mapping = json!({
        "storage": { "root": root.to_string_lossy() },
        "schemas": {
            "things": { "path": "things.csv" }
        },
        "groups": {
            "things": {
                "from": "things",
                "select": { "id": "things.id", "label": "things.label" },
                "where_any": { "id": "things.id" }
            }
        }
    });
    std::fs::write(root.join("things.csv"), "id,label\n1,widget\n2,sprocket\n").unwrap();

    let catalog = Arc::new(MappingCatalog::from_json(&mapping.to_string()).unwrap());
    let engine = Arc::new(Engine::open_in_memory().unwrap());
    let snapshots = Arc::new(SnapshotManager::new(catalog.clone(), engine.clone()));
    LookupExecutor::new(catalog, engine, snapshots)
}

// =============================================================================
// Bearer gate
// =============================================================================

/// An expired token is refused even though its signature is genuine.
#[test]
fn test_expired_token_rejected() {
    let now = chrono::Utc::now().timestamp();
    let token = token_with(TEST_PRIVATE_PEM, now - 7200, now - 3600);

    let err = verifier().verify(&token).unwrap_err();
    assert!(matches!(err, TrustError::TokenExpired));
    assert_eq!(err.status_code(), 401);
}

/// A token signed by a different key never verifies.
#[test]
fn test_token_from_wrong_key_rejected() {
    let token = fresh_token(OTHER_PRIVATE_PEM);

    let err = verifier().verify(&token).unwrap_err();
    assert!(matches!(err, TrustError::InvalidSignature));
    assert_eq!(err.status_code(), 401);
}

/// Every rejection reason collapses to the same caller-visible status.
#[test]
fn test_rejection_reasons_share_one_status() {
    let verifier = verifier();
    let now = chrono::Utc::now().timestamp();

    let failures = [
        verifier
            .verify(&token_with(TEST_PRIVATE_PEM, now - 7200, now - 3600))
            .unwrap_err(),
        verifier.verify("garbage.token.here").unwrap_err(),
        verifier.verify(&fresh_token(OTHER_PRIVATE_PEM)).unwrap_err(),
        token_from_header("Basic abc123").unwrap_err(),
        token_from_header("").unwrap_err(),
    ];

    for err in failures {
        assert_eq!(err.status_code(), 401, "leaked a distinct status: {}", err);
    }
}

/// A valid token passes the gate and the lookup answers normally.
#[test]
fn test_valid_token_admits_lookup() {
    let dir = TempDir::new().unwrap();
    let executor = build_executor(dir.path());

    let header = format!("Bearer {}", fresh_token(TEST_PRIVATE_PEM));
    let token = token_from_header(&header).unwrap();
    let claims = verifier().verify(token).unwrap();
    assert_eq!(claims.sub.as_deref(), Some("caller"));

    let request: LookupRequest = serde_json::from_value(json!({
        "subject": { "id": "1" },
        "requested_fields": ["things"]
    }))
    .unwrap();
    let envelope = executor.run(&request, "SNAPGATE").unwrap();

    assert_eq!(envelope.status, "ok");
    assert_eq!(envelope.source_status, "live");
    assert!(envelope.data.contains_key("things"));
}

// =============================================================================
// Response signing
// =============================================================================

/// The signed response token embeds the envelope verbatim with the
/// configured lifetime.
#[test]
fn test_signed_response_carries_envelope_verbatim() {
    let dir = TempDir::new().unwrap();
    let executor = build_executor(dir.path());

    let request: LookupRequest = serde_json::from_value(json!({
        "subject": { "id": "2" },
        "requested_fields": ["things"]
    }))
    .unwrap();
    let envelope = executor.run(&request, "SNAPGATE").unwrap();

    let signer = ResponseSigner::from_pem(TEST_PRIVATE_PEM.as_bytes(), 120).unwrap();
    let token = signer.sign(&envelope).unwrap();

    let decoding_key = DecodingKey::from_rsa_pem(TEST_PUBLIC_PEM.as_bytes()).unwrap();
    let validation = Validation::new(Algorithm::RS256);
    let data = decode::<SignedEnvelopeClaims>(&token, &decoding_key, &validation).unwrap();

    assert_eq!(
        data.claims.envelope,
        serde_json::to_value(&envelope).unwrap()
    );
    assert_eq!(data.claims.exp - data.claims.iat, 120);

    let rows = data.claims.envelope["data"]["things"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["label"], json!("sprocket"));
}

/// Tampering with a signed response invalidates it.
#[test]
fn test_tampered_signed_response_rejected() {
    let dir = TempDir::new().unwrap();
    let executor = build_executor(dir.path());

    let request: LookupRequest = serde_json::from_value(json!({
        "subject": { "id": "1" },
        "requested_fields": ["things"]
    }))
    .unwrap();
    let envelope = executor.run(&request, "SNAPGATE").unwrap();

    let signer = ResponseSigner::from_pem(TEST_PRIVATE_PEM.as_bytes(), 120).unwrap();
    let token = signer.sign(&envelope).unwrap();

    // Flip one payload byte; the signature must no longer match
    let mut parts: Vec<String> = token.split('.').map(String::from).collect();
    let mut payload = parts[1].clone().into_bytes();
    let last = payload.len() - 1;
    payload[last] = if payload[last] == b'A' { b'B' } else { b'A' };
    parts[1] = String::from_utf8(payload).unwrap();
    let tampered = parts.join(".");

    let decoding_key = DecodingKey::from_rsa_pem(TEST_PUBLIC_PEM.as_bytes()).unwrap();
    let validation = Validation::new(Algorithm::RS256);
    assert!(decode::<SignedEnvelopeClaims>(&tampered, &decoding_key, &validation).is_err());
}
