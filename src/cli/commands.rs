//! CLI command implementations

use std::path::Path;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::loader::import_seed;
use crate::config::AppConfig;
use crate::models::Database;
use crate::rest_api::{ApiServer, AppState};

/// Parse the process arguments and run the chosen command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    crate::init_tracing();
    match cmd {
        Command::Serve { seed } => serve(seed.as_deref()),
        Command::Seed { dir } => seed(&dir),
    }
}

/// Boot the HTTP server and block until it shuts down
pub fn serve(seed_dir: Option<&Path>) -> CliResult<()> {
    let config = AppConfig::from_env()?;
    tracing::info!(environment = ?config.environment, "booting");

    let db = Database::open();
    if let Some(dir) = seed_dir {
        import_seed(&db, dir)?;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let state = AppState::from_config(&config, db)?;
        ApiServer::new(config, state).start().await?;
        Ok::<(), CliError>(())
    })
}

/// Import `dir` into a scratch store and print what was loaded
pub fn seed(dir: &Path) -> CliResult<()> {
    let db = Database::open();
    let counts = import_seed(&db, dir)?;

    println!(
        "imported {} tours, {} users, {} reviews from {}",
        counts.tours,
        counts.users,
        counts.reviews,
        dir.display()
    );
    Ok(())
}
