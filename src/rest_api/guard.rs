//! # Route Guards
//!
//! [`CurrentUser`] rejects a request unless it carries a valid bearer token
//! of an existing user; [`CurrentUser::restrict_to`] narrows a route further
//! to a set of roles.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::errors::{AppError, AppResult};
use super::state::AppState;
use crate::auth::AuthService;
use crate::models::{Role, User};

/// Roles allowed to manage tours
pub const TOUR_MANAGERS: [Role; 2] = [Role::Admin, Role::LeadGuide];

/// Roles that see the monthly plan
pub const TOUR_STAFF: [Role; 3] = [Role::Admin, Role::LeadGuide, Role::Guide];

/// Bearer token of the `Authorization` header
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

/// The logged-in user of a request
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// Fail with 403 unless the user has one of `roles`
    pub fn restrict_to(&self, roles: &[Role]) -> AppResult<&User> {
        AuthService::restrict_to(&self.0, roles)?;
        Ok(&self.0)
    }

    pub fn id(&self) -> &str {
        &self.0.id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = state.auth.protect(bearer_token(parts))?;
        Ok(Self(user))
    }
}
