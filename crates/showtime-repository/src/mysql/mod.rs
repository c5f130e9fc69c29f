//! MySQL repository implementations.

mod booking_repository;
mod movie_repository;
mod show_repository;
mod user_repository;

pub use booking_repository::MySqlBookingRepository;
pub use movie_repository::MySqlMovieRepository;
pub use show_repository::MySqlShowRepository;
pub use user_repository::MySqlUserRepository;

use showtime_core::{ShowtimeError, ShowtimeResult};
use uuid::Uuid;

/// Parses a `CHAR(36)` column.
fn parse_uuid(column: &str, value: &str) -> ShowtimeResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| ShowtimeError::Internal(format!("Invalid UUID in {column}: {e}")))
}
