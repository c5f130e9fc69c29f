//! REST API controllers.

pub mod booking_controller;
pub mod events_controller;
pub mod health_controller;
pub mod jobs_controller;
pub mod show_controller;
pub mod user_controller;
pub mod webhook_controller;

pub use health_controller::*;

use crate::responses::AppError;
use showtime_core::ShowtimeError;

/// Parses a UUID-backed id from a path segment.
pub(crate) fn parse_path_id<T, E>(
    raw: &str,
    what: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, AppError> {
    parse(raw).map_err(|_| AppError(ShowtimeError::validation(format!("Invalid {what} id: {raw}"))))
}
