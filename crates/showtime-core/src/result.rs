//! Result type aliases for Showtime.

use crate::ShowtimeError;

/// A specialized `Result` type for Showtime operations.
pub type ShowtimeResult<T> = Result<T, ShowtimeError>;
