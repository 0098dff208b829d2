//! # REST API Module
//!
//! HTTP endpoints for tours, users and reviews under `/api/v1`. List
//! endpoints hand the sanitized query string to the query shaper; writes go
//! through the store's validation and decorators.

pub mod errors;
pub mod guard;
pub mod handler;
pub mod rate_limit;
pub mod response;
pub mod reviews;
pub mod sanitize;
pub mod server;
pub mod state;
pub mod tours;
pub mod users;

pub use errors::{AppError, AppResult};
pub use guard::CurrentUser;
pub use rate_limit::{ClientIpKeyExtractor, RateLimit};
pub use response::ApiResponse;
pub use server::{build_router, ApiServer, ServerError, API_PREFIX};
pub use state::AppState;
