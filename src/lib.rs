//! tourbook - a tour-booking REST backend
//!
//! Tours, users and reviews live in an in-memory document store. List
//! endpoints run through the query-shaping layer in [`query`], which turns a
//! request's query string into filter, sort, field selection and pagination.

pub mod auth;
pub mod cli;
pub mod config;
pub mod models;
pub mod query;
pub mod rest_api;
pub mod store;

use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "tourbook=info,tower_http=info";

/// Install the global tracing subscriber. Later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = fmt().with_env_filter(filter).try_init();
}
