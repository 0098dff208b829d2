//! CLI-specific error types
//!
//! Every CLI error is fatal: it is printed to stderr and the process exits
//! non-zero.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::rest_api::ServerError;
use crate::store::StoreError;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("server error: {0}")]
    Server(#[from] ServerError),

    #[error("startup failed: {0}")]
    Auth(#[from] AuthError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cannot read seed file {path}: {source}")]
    SeedRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    SeedJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} must hold a JSON array")]
    SeedNotArray { path: PathBuf },

    #[error("seed import failed: {0}")]
    Store(#[from] StoreError),
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
