//! Application Configuration
//!
//! Settings come from the process environment, after `config.env` (if
//! present) has been loaded into it with `dotenvy`.

use std::net::SocketAddr;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{EmailConfig, JwtConfig};

/// File loaded into the environment at startup
pub const CONFIG_FILE: &str = "config.env";

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    /// A variable that must be set is missing
    #[error("Missing required setting {0}")]
    Missing(&'static str),
}

/// Which error bodies the API sends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Everything the server needs to start
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,

    /// Host to bind to (default: "0.0.0.0")
    pub host: String,

    /// Port to bind to (default: 3000)
    pub port: u16,

    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,

    pub jwt: JwtConfig,

    /// `None` sends mail through the logging sender
    pub email: Option<EmailConfig>,

    /// Requests allowed per client per window
    pub rate_limit_max: u32,

    pub rate_limit_window_secs: u64,

    /// Key rate limits on `X-Forwarded-For` instead of the peer address.
    /// Only safe behind a proxy that overwrites the header.
    pub trust_proxy: bool,

    /// Largest accepted JSON body
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            jwt: JwtConfig::default(),
            email: None,
            rate_limit_max: 100,
            rate_limit_window_secs: 3600,
            trust_proxy: false,
            body_limit_bytes: 10 * 1024,
        }
    }
}

impl AppConfig {
    /// Load `config.env` if it exists, then read the environment
    pub fn from_env() -> ConfigResult<Self> {
        match dotenvy::from_filename(CONFIG_FILE) {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded config file"),
            Err(err) if err.not_found() => {}
            Err(err) => tracing::warn!(error = %err, "could not read {CONFIG_FILE}"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from a variable lookup
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let environment = match get("APP_ENV").as_deref() {
            None | Some("development") => Environment::Development,
            Some("production") => Environment::Production,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "APP_ENV",
                    value: other.to_string(),
                })
            }
        };

        let secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None if environment.is_production() => return Err(ConfigError::Missing("JWT_SECRET")),
            None => defaults.jwt.secret.clone(),
        };
        let ttl = match get("JWT_EXPIRES_IN") {
            Some(raw) => parse_duration(&raw).ok_or(ConfigError::Invalid {
                key: "JWT_EXPIRES_IN",
                value: raw,
            })?,
            None => defaults.jwt.ttl,
        };

        let email = match get("EMAIL_HOST") {
            Some(smtp_host) => {
                let fallback = EmailConfig::default();
                Some(EmailConfig {
                    smtp_host,
                    smtp_port: parse_or(&get, "EMAIL_PORT", fallback.smtp_port)?,
                    smtp_user: get("EMAIL_USERNAME").unwrap_or_default(),
                    smtp_password: get("EMAIL_PASSWORD").unwrap_or_default(),
                    from: get("EMAIL_FROM").unwrap_or(fallback.from),
                })
            }
            None => None,
        };

        Ok(Self {
            environment,
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "PORT", defaults.port)?,
            cors_origins: get("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            jwt: JwtConfig { secret, ttl },
            email,
            rate_limit_max: parse_or(&get, "RATE_LIMIT_MAX", defaults.rate_limit_max)?,
            rate_limit_window_secs: parse_or(&get, "RATE_LIMIT_WINDOW_SECS", defaults.rate_limit_window_secs)?,
            trust_proxy: parse_or(&get, "TRUST_PROXY", defaults.trust_proxy)?,
            body_limit_bytes: parse_or(&get, "BODY_LIMIT_BYTES", defaults.body_limit_bytes)?,
        })
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parsed bind address
    pub fn bind_addr(&self) -> ConfigResult<SocketAddr> {
        let addr = self.socket_addr();
        addr.parse().map_err(|_| ConfigError::Invalid {
            key: "HOST",
            value: addr,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> ConfigResult<T>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

/// `90d`, `12h`, `30m`, `45s` or plain seconds. Amounts too large for a
/// duration are rejected.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last()? {
        (i, c) if c.is_ascii_alphabetic() => (&raw[..i], c),
        _ => (raw, 's'),
    };
    let amount: i64 = digits.parse().ok()?;
    if amount <= 0 {
        return None;
    }
    match unit {
        'd' => Duration::try_days(amount),
        'h' => Duration::try_hours(amount),
        'm' => Duration::try_minutes(amount),
        's' => Duration::try_seconds(amount),
        _ => None,
    }
}
