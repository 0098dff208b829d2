//! Shared state of every handler

use std::sync::Arc;

use crate::auth::{AuthService, EmailSender, JwtManager};
use crate::config::{AppConfig, ConfigResult, Environment};
use crate::models::Database;

use super::rate_limit::RateLimit;
use super::server::ServerError;

/// Handler state; cheap to clone
#[derive(Clone, Debug)]
pub struct AppState {
    pub db: Database,
    pub auth: AuthService,
    pub rate_limit: RateLimit,
    pub environment: Environment,
}

impl AppState {
    /// State with the mail transport the configuration asks for
    pub fn from_config(config: &AppConfig, db: Database) -> Result<Self, ServerError> {
        let email = crate::auth::create_email_sender(config.email.clone())?;
        Ok(Self::with_email_sender(config, db, email)?)
    }

    pub fn with_email_sender(config: &AppConfig, db: Database, email: Arc<dyn EmailSender>) -> ConfigResult<Self> {
        let auth = AuthService::new(Arc::clone(&db.users), JwtManager::new(config.jwt.clone()), email);

        Ok(Self {
            db,
            auth,
            rate_limit: RateLimit::from_config(config)?,
            environment: config.environment,
        })
    }
}
