//! # REST API Errors
//!
//! The HTTP-facing error of every handler. Each error renders as
//! `{status, message}` with `status` = `fail` for 4xx and `error` for 5xx.
//!
//! How much of an error a client sees depends on the environment, which
//! `IntoResponse` cannot know. The response therefore carries an
//! [`ErrorReport`] extension, and the [`render_errors`] middleware rewrites
//! the body for the running environment.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::config::Environment;
use crate::query::ShapeError;
use crate::store::StoreError;

/// Result type for handlers
pub type AppResult<T> = Result<T, AppError>;

/// REST API errors
#[derive(Debug, Clone, Error)]
pub enum AppError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Request body is not acceptable JSON
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Request body exceeds the configured limit
    #[error("Request body is too large")]
    PayloadTooLarge,

    /// Semantically wrong request
    #[error("{0}")]
    BadRequest(String),

    /// No document with the requested id
    #[error("No {0} found with that ID")]
    NotFound(&'static str),

    /// No route for the requested URL
    #[error("Can't find {0} on this server!")]
    RouteNotFound(String),

    /// Client exceeded its request budget
    #[error("Too many requests from this IP, please try again in an hour!")]
    TooManyRequests,

    /// Route exists but is served elsewhere
    #[error("This route is not defined! Please use {0} instead")]
    UndefinedRoute(&'static str),

    // ==================
    // Layer Errors
    // ==================
    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Unexpected failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        let code = match self {
            AppError::InvalidBody(_) => 400,
            AppError::PayloadTooLarge => 413,
            AppError::BadRequest(_) => 400,
            AppError::NotFound(_) => 404,
            AppError::RouteNotFound(_) => 404,
            AppError::TooManyRequests => 429,
            AppError::UndefinedRoute(_) => 500,
            AppError::Shape(err) => err.status_code(),
            AppError::Store(err) => err.status_code(),
            AppError::Auth(err) => err.status_code(),
            AppError::Internal(_) => 500,
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Whether the message is meant for the client
    pub fn is_operational(&self) -> bool {
        match self {
            AppError::Store(err) => err.is_operational(),
            AppError::Auth(err) => err.is_operational(),
            AppError::Internal(_) => false,
            _ => true,
        }
    }
}

/// `fail` for client errors, `error` for server errors
pub fn status_label(status: StatusCode) -> &'static str {
    if status.is_client_error() {
        "fail"
    } else {
        "error"
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    /// Debug representation, development only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What the error middleware needs to re-render an error
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub message: String,
    pub debug: String,
    pub operational: bool,
}

impl From<&AppError> for ErrorReport {
    fn from(err: &AppError) -> Self {
        Self {
            message: err.to_string(),
            debug: format!("{err:?}"),
            operational: err.is_operational(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let report = ErrorReport::from(&self);
        let body = Json(ErrorResponse {
            status: status_label(status),
            message: report.message.clone(),
            error: None,
        });

        let mut response = (status, body).into_response();
        response.extensions_mut().insert(report);
        response
    }
}

/// Re-render error responses for the running environment.
///
/// Development adds the debug representation. Production hides errors that
/// are not operational behind a generic 500. Headers other than the body's
/// own are kept.
pub async fn render_errors(State(environment): State<Environment>, mut response: Response) -> Response {
    let Some(report) = response.extensions_mut().remove::<ErrorReport>() else {
        return response;
    };
    let status = response.status();

    if !report.operational {
        tracing::error!(error = %report.debug, "unexpected error");
    }

    let (status, body) = match environment {
        Environment::Development => (
            status,
            ErrorResponse {
                status: status_label(status),
                message: report.message,
                error: Some(report.debug),
            },
        ),
        Environment::Production if report.operational => (
            status,
            ErrorResponse {
                status: status_label(status),
                message: report.message,
                error: None,
            },
        ),
        Environment::Production => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse {
                status: "error",
                message: "Something went wrong!".to_string(),
                error: None,
            },
        ),
    };

    let mut rendered = (status, Json(body)).into_response();
    for (name, value) in response.headers() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            rendered.headers_mut().append(name.clone(), value.clone());
        }
    }
    rendered
}
