//! CLI argument definitions using clap
//!
//! Commands:
//! - snapgate serve --config <path>
//! - snapgate verify --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SnapGate - authenticated lookup gateway over cached columnar snapshots
#[derive(Parser, Debug)]
#[command(name = "snapgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the lookup gateway server
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./snapgate.json")]
        config: PathBuf,
    },

    /// Verify cached snapshots against the checksum manifest and exit
    Verify {
        /// Path to configuration file
        #[arg(long, default_value = "./snapgate.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
