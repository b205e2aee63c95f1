//! Observability for snapgate
//!
//! Structured one-line JSON logging with explicit severities and
//! deterministic field ordering. Logging is synchronous and read-only with
//! respect to the serving path.

mod logger;

pub use logger::{Logger, Severity};

#[cfg(test)]
pub use logger::capture_log;
