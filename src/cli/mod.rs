//! CLI module for the lookup gateway
//!
//! Provides command-line interface for:
//! - serve: boot the service context and run the HTTP server
//! - verify: one-shot snapshot integrity check

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{run, run_command, serve, verify};
pub use errors::{CliError, CliResult};
