//! Request and response shapes of the application services.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use showtime_core::{Booking, Movie, MovieId, Show, ShowId};
use std::collections::BTreeMap;
use validator::Validate;

/// Seats a user wants on one show.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub show_id: ShowId,
    #[validate(length(min = 1, max = 20, message = "Select between 1 and 20 seats"))]
    pub selected_seats: Vec<String>,
}

/// A booking with the show and movie it refers to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub show: Option<ShowDetails>,
}

/// A show with its movie.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowDetails {
    #[serde(flatten)]
    pub show: Show,
    pub movie: Option<Movie>,
}

/// One start time of a movie on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowTime {
    pub time: chrono::DateTime<chrono::Utc>,
    pub show_id: ShowId,
}

/// A movie with its upcoming show times grouped by day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieSchedule {
    pub movie: Movie,
    pub date_time: BTreeMap<NaiveDate, Vec<ShowTime>>,
}

/// Start times on one day, as `HH:MM`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ShowsInput {
    pub date: NaiveDate,
    #[validate(length(min = 1, message = "At least one time is required"))]
    pub time: Vec<String>,
}

/// Admin request to schedule shows of a movie.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddShowsRequest {
    pub movie: Movie,
    #[validate(length(min = 1, message = "At least one date is required"), nested)]
    pub shows_input: Vec<ShowsInput>,
    /// Ticket price in minor units.
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub show_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleFavoriteRequest {
    pub movie_id: MovieId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteToggled {
    pub favorite: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidateExt;

    #[test]
    fn test_empty_seat_selection_is_invalid() {
        let request = CreateBookingRequest {
            show_id: ShowId::new(),
            selected_seats: vec![],
        };
        let err = request.validate_request().unwrap_err();
        assert!(err.to_string().contains("selected_seats"));
    }

    #[test]
    fn test_add_shows_request_parses_wire_shape() {
        let request: AddShowsRequest = serde_json::from_value(serde_json::json!({
            "movie": {
                "id": "550",
                "title": "Fight Club",
                "overview": "",
                "posterPath": "/p.jpg",
                "backdropPath": "/b.jpg",
                "releaseDate": "1999-10-15",
                "voteAverage": 8.4,
                "runtime": 139
            },
            "showsInput": [{ "date": "2030-01-01", "time": ["18:00", "21:30"] }],
            "showPrice": 1200
        }))
        .unwrap();

        assert!(request.validate_request().is_ok());
        assert_eq!(request.shows_input[0].time.len(), 2);
    }

    #[test]
    fn test_nested_time_list_is_validated() {
        let request: AddShowsRequest = serde_json::from_value(serde_json::json!({
            "movie": {
                "id": "550", "title": "Fight Club", "overview": "",
                "posterPath": "", "backdropPath": "", "releaseDate": "1999-10-15",
                "voteAverage": 8.4, "runtime": 139
            },
            "showsInput": [{ "date": "2030-01-01", "time": [] }],
            "showPrice": 1200
        }))
        .unwrap();

        let err = request.validate_request().unwrap_err();
        assert!(err.to_string().contains("shows_input[0].time"));
    }
}
