//! # Lookup Routes
//!
//! Bearer-gated lookup and integrity endpoints plus the unauthenticated
//! connectivity probe. Every authentication failure maps to the same
//! 401 body so callers learn nothing about why a token was rejected.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use serde_json::{json, Value};

use crate::lookup::{LookupError, LookupRequest};
use crate::observability::Logger;
use crate::service::ServiceContext;
use crate::snapshot::SnapshotError;
use crate::trust::{token_from_header, BearerClaims};

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

/// Integrity check response body
#[derive(Debug, Serialize)]
pub struct IntegrityResponse {
    pub status: &'static str,
    pub message: String,
    pub checked: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_mismatch: Option<String>,
}

/// Create the lookup gateway router
pub fn lookup_routes(context: Arc<ServiceContext>) -> Router {
    Router::new()
        .route("/v1/lookup", post(lookup_handler))
        .route("/v1/integrity", get(integrity_handler))
        .route("/get-info", get(probe_handler))
        .with_state(context)
}

/// POST /v1/lookup - run a subject lookup and return the envelope
async fn lookup_handler(
    State(context): State<Arc<ServiceContext>>,
    headers: HeaderMap,
    Json(request): Json<LookupRequest>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    authorize(&context, &headers)?;

    let shared = context.clone();
    let envelope = tokio::task::spawn_blocking(move || {
        shared.executor.run(&request, &shared.default_source_id)
    })
    .await
    .map_err(|e| internal_error(format!("Lookup task failed: {}", e)))?
    .map_err(lookup_error)?;

    match &context.signer {
        Some(signer) => {
            let token = signer
                .sign(&envelope)
                .map_err(|e| internal_error(e.to_string()))?;
            Ok(Json(json!({ "jwt": token })))
        }
        None => {
            let body = serde_json::to_value(&envelope)
                .map_err(|e| internal_error(e.to_string()))?;
            Ok(Json(body))
        }
    }
}

/// GET /v1/integrity - verify cached snapshots against the manifest
async fn integrity_handler(
    State(context): State<Arc<ServiceContext>>,
    headers: HeaderMap,
) -> Result<Json<IntegrityResponse>, (StatusCode, Json<ErrorResponse>)> {
    authorize(&context, &headers)?;

    let shared = context.clone();
    let report = tokio::task::spawn_blocking(move || shared.snapshots.verify_integrity())
        .await
        .map_err(|e| internal_error(format!("Integrity task failed: {}", e)))?
        .map_err(snapshot_error)?;

    Ok(Json(IntegrityResponse {
        status: if report.ok { "pass" } else { "fail" },
        message: report.message,
        checked: report.checked,
        first_mismatch: report.first_mismatch,
    }))
}

/// GET /get-info - unauthenticated connectivity probe
async fn probe_handler() -> &'static str {
    "good connect"
}

/// Check the bearer token; any failure becomes the uniform 401 body
fn authorize(
    context: &ServiceContext,
    headers: &HeaderMap,
) -> Result<BearerClaims, (StatusCode, Json<ErrorResponse>)> {
    let header = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    token_from_header(header)
        .and_then(|token| context.verifier.verify(token))
        .map_err(|e| {
            Logger::warn("AUTH_REJECTED", &[("detail", &e.to_string())]);
            unauthorized()
        })
}

fn unauthorized() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "unauthorized".to_string(),
            code: 401,
        }),
    )
}

fn internal_error(message: String) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message,
            code: 500,
        }),
    )
}

fn lookup_error(e: LookupError) -> (StatusCode, Json<ErrorResponse>) {
    let code = e.status_code();
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            code,
        }),
    )
}

fn snapshot_error(e: SnapshotError) -> (StatusCode, Json<ErrorResponse>) {
    let code = e.status_code();
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            code,
        }),
    )
}
