//! # Query Shaping Errors

use thiserror::Error;

/// Result type for query shaping
pub type ShapeResult<T> = Result<T, ShapeError>;

/// Errors raised while shaping a list query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    /// `page` or `limit` is not a whole number
    #[error("Invalid {key}: {value}. Expected a whole number")]
    InvalidNumber { key: String, value: String },

    /// `page` or `limit` is zero or negative
    #[error("Invalid {key}: {value}. Must be at least 1")]
    BelowMinimum { key: String, value: i64 },

    /// Requested page starts past the last matching document
    #[error("This page does not exist")]
    PageNotFound { page: u64, total: u64 },
}

impl ShapeError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShapeError::InvalidNumber { .. } => 400,
            ShapeError::BelowMinimum { .. } => 400,
            ShapeError::PageNotFound { .. } => 404,
        }
    }
}
