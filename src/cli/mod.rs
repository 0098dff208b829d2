//! CLI module for tourbook
//!
//! Provides command-line interface for:
//! - serve: boot the HTTP server, optionally seeding the store
//! - seed: dry-run a seed import and report document counts

mod args;
mod commands;
mod errors;
mod loader;

pub use args::{Cli, Command};
pub use commands::{run, run_command, seed, serve};
pub use errors::{CliError, CliResult};
pub use loader::{import_seed, SeedCounts, REVIEWS_FILE, TOURS_FILE, USERS_FILE};
