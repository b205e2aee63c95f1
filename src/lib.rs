//! snapgate - a signed lookup gateway over versioned columnar snapshots
//!
//! Callers ask for named field groups about a subject; snapgate compiles the
//! declarative mapping into engine SQL, runs it against locally cached
//! columnar files, and answers with a normalized, optionally signed envelope.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod http_server;
pub mod lookup;
pub mod observability;
pub mod query;
pub mod service;
pub mod snapshot;
pub mod trust;
