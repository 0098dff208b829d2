//! Review routes, mounted at `/api/v1/reviews` and nested under
//! `/api/v1/tours/:id/reviews`
//!
//! Every write recomputes the rating summary of the affected tour.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde_json::Value;

use super::errors::AppResult;
use super::guard::CurrentUser;
use super::handler;
use super::response::{no_content, ApiResponse};
use super::sanitize::{JsonBody, QueryParams};
use super::state::AppState;
use crate::models::review::recalc_ratings;
use crate::models::Role;
use crate::query::Filter;

const RESOURCE: &str = "review";

/// Roles that may write reviews
const REVIEWERS: [Role; 1] = [Role::User];

/// Roles that may edit or remove a review
const REVIEW_EDITORS: [Role; 2] = [Role::User, Role::Admin];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_all_reviews).post(create_review))
        .route("/:id", get(get_review).patch(update_review).delete(delete_review))
}

fn recalc_for(state: &AppState, review: &Value) -> AppResult<()> {
    if let Some(tour_id) = review.get("tour").and_then(Value::as_str) {
        recalc_ratings(&state.db.reviews, &state.db.tours, tour_id)?;
    }
    Ok(())
}

async fn get_all_reviews(State(state): State<AppState>, QueryParams(params): QueryParams) -> AppResult<ApiResponse> {
    let reviews = handler::list(&state.db.reviews, Filter::new(), &params).await?;
    Ok(ApiResponse::list("reviews", reviews))
}

pub(super) async fn get_tour_reviews(
    State(state): State<AppState>,
    Path(tour_id): Path<String>,
    QueryParams(params): QueryParams,
) -> AppResult<ApiResponse> {
    let reviews = handler::list(&state.db.reviews, Filter::eq("tour", tour_id), &params).await?;
    Ok(ApiResponse::list("reviews", reviews))
}

fn create(state: &AppState, user: &CurrentUser, mut body: JsonBody, tour_id: Option<String>) -> AppResult<ApiResponse> {
    user.restrict_to(&REVIEWERS)?;

    if let Some(tour_id) = tour_id {
        body.0.entry("tour").or_insert(Value::String(tour_id));
    }
    body.0
        .entry("user")
        .or_insert_with(|| Value::String(user.id().to_string()));

    let review = handler::create_one(&state.db.reviews, body.into_value())?;
    recalc_for(state, &review)?;
    Ok(ApiResponse::created("review", review))
}

async fn create_review(State(state): State<AppState>, user: CurrentUser, body: JsonBody) -> AppResult<ApiResponse> {
    create(&state, &user, body, None)
}

pub(super) async fn create_tour_review(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(tour_id): Path<String>,
    body: JsonBody,
) -> AppResult<ApiResponse> {
    create(&state, &user, body, Some(tour_id))
}

async fn get_review(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<ApiResponse> {
    let review = handler::get_one(&state.db.reviews, &id, RESOURCE)?;
    Ok(ApiResponse::ok("review", review))
}

async fn update_review(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    body: JsonBody,
) -> AppResult<ApiResponse> {
    user.restrict_to(&REVIEW_EDITORS)?;
    let review = handler::update_one(&state.db.reviews, &id, body.into_value(), RESOURCE)?;
    recalc_for(&state, &review)?;
    Ok(ApiResponse::ok("review", review))
}

async fn delete_review(State(state): State<AppState>, user: CurrentUser, Path(id): Path<String>) -> AppResult<Response> {
    user.restrict_to(&REVIEW_EDITORS)?;
    let removed = handler::delete_one(&state.db.reviews, &id, RESOURCE)?;
    recalc_for(&state, &removed)?;
    Ok(no_content())
}
