//! # REST API HTTP Server
//!
//! Builds the `/api/v1` router with its middleware stack and serves it.
//!
//! Layers, outermost first: request tracing, CORS, error rendering, body
//! limit. The per-client rate limit guards the resource routes only.

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, OriginalUri};
use axum::middleware::map_response_with_state;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::errors::{render_errors, AppError};
use super::state::AppState;
use super::{reviews, tours, users};
use crate::auth::AuthError;
use crate::config::{AppConfig, ConfigError};

/// Prefix of every resource route
pub const API_PREFIX: &str = "/api/v1";

/// How often clients with a full rate-limit budget are forgotten
const PRUNE_INTERVAL: Duration = Duration::from_secs(600);

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server for the tour API
pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(&self) -> Router {
        build_router(&self.config, self.state.clone())
    }

    /// Serve until Ctrl+C or SIGTERM
    pub async fn start(self) -> Result<(), ServerError> {
        let addr = self.config.bind_addr()?;
        let router = self.router();

        let rate_limit = self.state.rate_limit.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PRUNE_INTERVAL);
            loop {
                interval.tick().await;
                rate_limit.prune();
            }
        });

        tracing::info!(
            %addr,
            environment = ?self.config.environment,
            trust_proxy = self.config.trust_proxy,
            "binding"
        );
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("listening on http://{addr}{API_PREFIX}");

        axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("server stopped");
        Ok(())
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<_> = origins.iter().filter_map(|s| s.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// The complete application router
pub fn build_router(config: &AppConfig, state: AppState) -> Router {
    let api = Router::new()
        .nest("/tours", tours::routes())
        .nest("/users", users::routes())
        .nest("/reviews", reviews::routes())
        .route_layer(state.rate_limit.layer());

    Router::new()
        .route("/", get(greeting))
        .nest(API_PREFIX, api)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(map_response_with_state(state.environment, render_errors))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn greeting() -> impl IntoResponse {
    Json(json!({"message": "Hello from the server side"}))
}

async fn route_not_found(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::RouteNotFound(uri.to_string())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(err) => {
                tracing::error!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
