//! # Lookup Gateway HTTP Module
//!
//! HTTP surface of the gateway: the bearer-gated lookup and integrity
//! endpoints plus the connectivity probe, served by a single Axum router.
//!
//! # Endpoints
//!
//! - `POST /v1/lookup` - subject lookup (bearer)
//! - `GET /v1/integrity` - snapshot integrity check (bearer)
//! - `GET /get-info` - unauthenticated connectivity probe

pub mod lookup_routes;
pub mod server;

pub use lookup_routes::{ErrorResponse, IntegrityResponse};
pub use server::HttpServer;
