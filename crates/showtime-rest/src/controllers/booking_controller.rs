//! Seat booking controller.

use crate::{
    controllers::parse_path_id,
    extractors::{AuthenticatedUser, ValidatedJson},
    responses::{created, ok, ApiResponse, ApiResult, AppError},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use showtime_core::{Booking, BookingId, ShowId};
use showtime_service::CreateBookingRequest;
use tracing::debug;

/// Creates the booking router, nested under `/bookings`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking))
        .route("/seats/:show_id", get(occupied_seats))
        .route("/:id/confirm-payment", post(confirm_payment))
}

/// Seats already held on a show.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupiedSeats {
    pub occupied_seats: Vec<String>,
}

/// Holds the selected seats for the caller until payment.
async fn create_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Booking>>), AppError> {
    debug!(user_id = %user.sub, show_id = %request.show_id, "Create booking request");
    let booking = state
        .booking_service
        .create_booking(&user.user_id(), request)
        .await?;
    Ok(created(booking))
}

async fn occupied_seats(
    State(state): State<AppState>,
    Path(show_id): Path<String>,
) -> ApiResult<OccupiedSeats> {
    let show_id = parse_path_id(&show_id, "show", ShowId::parse)?;
    ok(OccupiedSeats {
        occupied_seats: state.booking_service.occupied_seats(show_id).await?,
    })
}

/// Marks the caller's booking paid.
async fn confirm_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<Booking> {
    let booking_id = parse_path_id(&id, "booking", BookingId::parse)?;
    ok(state
        .booking_service
        .confirm_payment(&user.user_id(), booking_id)
        .await?)
}
