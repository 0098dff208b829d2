//! # Rate Limiting
//!
//! Per-client request budget enforced by `tower_governor`. A client may
//! spend `max` requests at once and earns one back every `window / max`.
//!
//! Clients are keyed on the peer address of the connection. The
//! `X-Forwarded-For` header is only consulted when the deployment declares
//! a proxy in front of the server (`TRUST_PROXY`).

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request, Response};
use axum::response::IntoResponse;
use governor::middleware::StateInformationMiddleware;
use tower_governor::governor::{GovernorConfig, GovernorConfigBuilder};
use tower_governor::key_extractor::KeyExtractor;
use tower_governor::{GovernorError, GovernorLayer};

use super::errors::AppError;
use crate::config::{AppConfig, ConfigError, ConfigResult};

/// Header carrying the client chain behind a proxy
pub const FORWARDED_FOR: &str = "x-forwarded-for";

type ClientGovernor = GovernorConfig<ClientIpKeyExtractor, StateInformationMiddleware>;

/// Attributes a request to the IP address it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIpKeyExtractor {
    trust_proxy: bool,
}

impl ClientIpKeyExtractor {
    pub fn new(trust_proxy: bool) -> Self {
        Self { trust_proxy }
    }

    /// The client address of `request`.
    ///
    /// Behind a trusted proxy this is the last `X-Forwarded-For` entry, the
    /// one the proxy appended. Otherwise it is the connection's peer.
    pub fn client_ip<T>(&self, request: &Request<T>) -> Option<IpAddr> {
        let forwarded = if self.trust_proxy {
            last_forwarded_for(request.headers())
        } else {
            None
        };

        forwarded.or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
    }
}

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, request: &Request<T>) -> Result<Self::Key, GovernorError> {
        self.client_ip(request).ok_or(GovernorError::UnableToExtractKey)
    }
}

fn last_forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get(FORWARDED_FOR)?
        .to_str()
        .ok()?
        .rsplit(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Render limiter rejections as API errors
fn governor_error(error: GovernorError) -> Response<Body> {
    match error {
        GovernorError::TooManyRequests { wait_time, headers } => {
            tracing::warn!(retry_after_secs = wait_time, "rate limit exceeded");
            let mut response = AppError::TooManyRequests.into_response();
            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }
            response
        }
        GovernorError::UnableToExtractKey => {
            AppError::Internal("Unable to determine the client address".to_string()).into_response()
        }
        GovernorError::Other { code, msg, .. } => {
            AppError::Internal(msg.unwrap_or_else(|| code.to_string())).into_response()
        }
    }
}

/// The shared limiter of one running API
#[derive(Clone)]
pub struct RateLimit {
    config: Arc<ClientGovernor>,
    max: u32,
}

impl RateLimit {
    /// Limiter for the configured budget. A zero budget, a zero window or
    /// a window too short to divide among `max` requests is rejected.
    pub fn from_config(config: &AppConfig) -> ConfigResult<Self> {
        let max = config.rate_limit_max;
        if max == 0 {
            return Err(ConfigError::Invalid {
                key: "RATE_LIMIT_MAX",
                value: max.to_string(),
            });
        }
        let period = Duration::from_secs(config.rate_limit_window_secs) / max;

        let governor = GovernorConfigBuilder::default()
            .period(period)
            .burst_size(max)
            .key_extractor(ClientIpKeyExtractor::new(config.trust_proxy))
            .use_headers()
            .error_handler(governor_error)
            .finish()
            .ok_or_else(|| ConfigError::Invalid {
                key: "RATE_LIMIT_WINDOW_SECS",
                value: config.rate_limit_window_secs.to_string(),
            })?;

        Ok(Self {
            config: Arc::new(governor),
            max,
        })
    }

    pub fn limit(&self) -> u32 {
        self.max
    }

    /// Middleware enforcing this limiter
    pub fn layer(&self) -> GovernorLayer<ClientIpKeyExtractor, StateInformationMiddleware> {
        GovernorLayer {
            config: Arc::clone(&self.config),
        }
    }

    /// Forget clients whose budget has fully replenished
    pub fn prune(&self) {
        let limiter = self.config.limiter();
        limiter.retain_recent();
        tracing::debug!(clients = limiter.len(), "pruned rate limiter");
    }

    pub fn tracked_clients(&self) -> usize {
        self.config.limiter().len()
    }
}

impl fmt::Debug for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimit")
            .field("max", &self.max)
            .field("clients", &self.tracked_clients())
            .finish()
    }
}
