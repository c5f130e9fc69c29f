//! Show listing and scheduling controller.

use crate::{
    extractors::{AdminUser, ValidatedJson},
    responses::{created, ok, ApiResponse, ApiResult, AppError},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use showtime_core::{MovieId, Show};
use showtime_service::{AddShowsRequest, MovieSchedule, ShowDetails};
use tracing::info;

/// Creates the show router, nested under `/shows`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(upcoming_shows).post(add_shows))
        .route("/:movie_id", get(movie_schedule))
}

/// Upcoming shows with their movies.
async fn upcoming_shows(State(state): State<AppState>) -> ApiResult<Vec<ShowDetails>> {
    ok(state.show_service.upcoming_shows(Utc::now()).await?)
}

/// A movie and its upcoming show times grouped by day.
async fn movie_schedule(
    State(state): State<AppState>,
    Path(movie_id): Path<String>,
) -> ApiResult<MovieSchedule> {
    ok(state
        .show_service
        .movie_schedule(&MovieId::new(movie_id), Utc::now())
        .await?)
}

/// Schedules shows of a movie (admin only).
async fn add_shows(
    State(state): State<AppState>,
    admin: AdminUser,
    ValidatedJson(request): ValidatedJson<AddShowsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<Show>>>), AppError> {
    let shows = state.show_service.add_shows(request).await?;
    info!(admin = %admin.0.sub, count = shows.len(), "Shows added");
    Ok(created(shows))
}
