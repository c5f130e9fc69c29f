//! Signed-in user's bookings and favorites.

use crate::{
    extractors::AuthenticatedUser,
    responses::{ok, ApiResult},
    state::AppState,
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use showtime_core::Movie;
use showtime_service::{BookingDetails, FavoriteToggled, ToggleFavoriteRequest};
use tracing::debug;

/// Creates the user router, nested under `/user`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(user_bookings))
        .route("/update-favorite", post(update_favorite))
        .route("/favorites", get(favorites))
}

/// The caller's bookings, newest first.
async fn user_bookings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Vec<BookingDetails>> {
    debug!(user_id = %user.sub, "List bookings request");
    ok(state.booking_service.user_bookings(&user.user_id()).await?)
}

/// Adds or removes a movie from the caller's favorites.
async fn update_favorite(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ToggleFavoriteRequest>,
) -> ApiResult<FavoriteToggled> {
    ok(state
        .user_service
        .toggle_favorite(&user.user_id(), &request.movie_id)
        .await?)
}

async fn favorites(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<Vec<Movie>> {
    ok(state.user_service.favorites(&user.user_id()).await?)
}
