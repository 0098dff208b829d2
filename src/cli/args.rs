//! CLI argument definitions using clap
//!
//! Commands:
//! - tourbook serve [--seed <dir>]
//! - tourbook seed <dir>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tourbook - tour-booking REST backend
#[derive(Parser, Debug)]
#[command(name = "tourbook")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Directory holding tours.json, users.json and reviews.json to load at boot
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Load the seed files into a scratch store and report document counts
    Seed {
        /// Directory holding tours.json, users.json and reviews.json
        dir: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
