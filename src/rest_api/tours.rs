//! Tour routes, mounted at `/api/v1/tours`

use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use super::errors::AppResult;
use super::guard::{CurrentUser, TOUR_MANAGERS, TOUR_STAFF};
use super::handler;
use super::response::{no_content, ApiResponse};
use super::reviews;
use super::sanitize::{JsonBody, QueryParams};
use super::state::AppState;
use crate::models::aggregate;
use crate::query::Filter;

const RESOURCE: &str = "tour";

/// Page size of the top-5-cheap alias
pub const TOP_TOURS_LIMIT: &str = "5";

/// Ordering of the top-5-cheap alias
pub const TOP_TOURS_SORT: &str = "-ratingsAverage,price";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_all_tours).post(create_tour))
        .route("/top-5-cheap", get(top_tours))
        .route("/tour-stats", get(tour_stats))
        .route("/monthly-plan/:year", get(monthly_plan))
        .route("/:id", get(get_tour).patch(update_tour).delete(delete_tour))
        .route(
            "/:id/reviews",
            get(reviews::get_tour_reviews).post(reviews::create_tour_review),
        )
}

async fn get_all_tours(State(state): State<AppState>, QueryParams(params): QueryParams) -> AppResult<ApiResponse> {
    let tours = handler::list(&state.db.tours, Filter::new(), &params).await?;
    Ok(ApiResponse::list("tours", tours))
}

/// The five best rated tours, cheapest first on ties
async fn top_tours(State(state): State<AppState>, QueryParams(params): QueryParams) -> AppResult<ApiResponse> {
    let params = params
        .with("limit", TOP_TOURS_LIMIT)
        .with("sort", TOP_TOURS_SORT);
    let tours = handler::list(&state.db.tours, Filter::new(), &params).await?;
    Ok(ApiResponse::list("tours", tours))
}

async fn tour_stats(State(state): State<AppState>) -> AppResult<ApiResponse> {
    let stats = aggregate::tour_stats(&state.db.tours)?;
    Ok(ApiResponse::ok("stats", stats))
}

async fn monthly_plan(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(year): Path<String>,
) -> AppResult<ApiResponse> {
    user.restrict_to(&TOUR_STAFF)?;
    let year = aggregate::parse_year(&year)?;
    let plan = aggregate::monthly_plan(&state.db.tours, year)?;
    Ok(ApiResponse::ok("plan", plan))
}

async fn get_tour(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<ApiResponse> {
    let tour = handler::get_one(&state.db.tours, &id, RESOURCE)?;
    Ok(ApiResponse::ok("tour", tour))
}

async fn create_tour(State(state): State<AppState>, user: CurrentUser, body: JsonBody) -> AppResult<ApiResponse> {
    user.restrict_to(&TOUR_MANAGERS)?;
    let tour = handler::create_one(&state.db.tours, body.into_value())?;
    tracing::info!(tour = ?tour.get("_id"), by = %user.id(), "tour created");
    Ok(ApiResponse::created("tour", tour))
}

async fn update_tour(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    body: JsonBody,
) -> AppResult<ApiResponse> {
    user.restrict_to(&TOUR_MANAGERS)?;
    let tour = handler::update_one(&state.db.tours, &id, body.into_value(), RESOURCE)?;
    Ok(ApiResponse::ok("tour", tour))
}

async fn delete_tour(State(state): State<AppState>, user: CurrentUser, Path(id): Path<String>) -> AppResult<Response> {
    user.restrict_to(&TOUR_MANAGERS)?;
    handler::delete_one(&state.db.tours, &id, RESOURCE)?;
    tracing::info!(tour = %id, by = %user.id(), "tour deleted");
    Ok(no_content())
}
