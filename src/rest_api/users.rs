//! User routes, mounted at `/api/v1/users`
//!
//! Signup, login and the password reset are public. The `Me` routes need a
//! logged-in user. The management routes are for admins.

use axum::extract::{Path, State};
use axum::http::header::HOST;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::{get, patch, post, put};
use axum::Router;
use serde_json::{json, Value};

use super::errors::{AppError, AppResult};
use super::guard::CurrentUser;
use super::handler;
use super::response::{no_content, ApiResponse};
use super::sanitize::{JsonBody, QueryParams};
use super::state::AppState;
use crate::models::user::{filter_fields, SELF_EDITABLE};
use crate::models::Role;
use crate::query::Filter;
use crate::store::{Validation, ID_FIELD};

const RESOURCE: &str = "user";

const ADMINS: [Role; 1] = [Role::Admin];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/forgotPassword", post(forgot_password))
        .route("/resetPassword/:token", patch(reset_password))
        .route("/updateMyPassword", put(update_my_password))
        .route("/updateMe", put(update_me))
        .route("/deleteMe", put(delete_me))
        .route("/", get(get_all_users).post(create_user))
        .route("/:id", get(get_user).patch(update_user).delete(delete_user))
}

/// `scheme://host` the client used, for links in outgoing mail
fn request_origin(headers: &HeaderMap) -> String {
    let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());
    let scheme = header("x-forwarded-proto").unwrap_or("http");
    let host = header(HOST.as_str()).unwrap_or("localhost");
    format!("{scheme}://{host}")
}

// ==================
// Public
// ==================

async fn signup(State(state): State<AppState>, body: JsonBody) -> AppResult<ApiResponse> {
    let issued = state.auth.signup(&body.0)?;
    Ok(ApiResponse::created("user", issued.user).with_token(issued.token))
}

async fn login(State(state): State<AppState>, body: JsonBody) -> AppResult<ApiResponse> {
    let token = state.auth.login(body.str("email"), body.str("password"))?;
    Ok(ApiResponse::empty().with_token(token))
}

async fn forgot_password(State(state): State<AppState>, headers: HeaderMap, body: JsonBody) -> AppResult<ApiResponse> {
    state
        .auth
        .forgot_password(body.str("email"), &request_origin(&headers))
        .await?;
    Ok(ApiResponse::empty().with_message("Token sent to email!"))
}

async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    body: JsonBody,
) -> AppResult<ApiResponse> {
    let issued = state
        .auth
        .reset_password(&token, body.get("password"), body.get("passwordConfirm"))?;
    Ok(ApiResponse::empty().with_token(issued.token))
}

// ==================
// Logged In
// ==================

async fn update_my_password(State(state): State<AppState>, user: CurrentUser, body: JsonBody) -> AppResult<ApiResponse> {
    let issued = state.auth.update_password(
        user.id(),
        body.str("passwordCurrent"),
        body.get("password"),
        body.get("passwordConfirm"),
    )?;
    Ok(ApiResponse::ok("user", issued.user).with_token(issued.token))
}

async fn update_me(State(state): State<AppState>, user: CurrentUser, body: JsonBody) -> AppResult<ApiResponse> {
    if body.contains_key("password") || body.contains_key("passwordConfirm") {
        return Err(AppError::BadRequest(
            "This route is not for password updates. Please use /updateMyPassword".to_string(),
        ));
    }

    let changes = filter_fields(&body.0, &SELF_EDITABLE);
    let updated = handler::update_one(&state.db.users, user.id(), Value::Object(changes), RESOURCE)?;
    Ok(ApiResponse::ok("user", updated))
}

/// Deactivate the account; the user disappears from every read
async fn delete_me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    state
        .db
        .users
        .update_by_id(user.id(), json!({"active": false}), Validation::Skip)?;
    tracing::info!(user = %user.id(), "account deactivated");
    Ok(no_content())
}

// ==================
// Admin
// ==================

async fn get_all_users(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(params): QueryParams,
) -> AppResult<ApiResponse> {
    user.restrict_to(&ADMINS)?;
    let users = handler::list(&state.db.users, Filter::new(), &params).await?;
    Ok(ApiResponse::list("users", users))
}

async fn create_user(user: CurrentUser) -> AppResult<ApiResponse> {
    user.restrict_to(&ADMINS)?;
    Err(AppError::UndefinedRoute("/signup"))
}

async fn get_user(State(state): State<AppState>, user: CurrentUser, Path(id): Path<String>) -> AppResult<ApiResponse> {
    user.restrict_to(&ADMINS)?;
    let found = handler::get_one(&state.db.users, &id, RESOURCE)?;
    Ok(ApiResponse::ok("user", found))
}

/// Admin edit of a user; passwords are changed through the reset flow only
async fn update_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    mut body: JsonBody,
) -> AppResult<ApiResponse> {
    user.restrict_to(&ADMINS)?;
    for field in ["password", "passwordConfirm", ID_FIELD] {
        body.0.remove(field);
    }
    let updated = handler::update_one(&state.db.users, &id, body.into_value(), RESOURCE)?;
    Ok(ApiResponse::ok("user", updated))
}

async fn delete_user(State(state): State<AppState>, user: CurrentUser, Path(id): Path<String>) -> AppResult<Response> {
    user.restrict_to(&ADMINS)?;
    handler::delete_one(&state.db.users, &id, RESOURCE)?;
    tracing::info!(user = %id, by = %user.id(), "user deleted");
    Ok(no_content())
}
