//! Show entity and its seat occupancy map.

use crate::{MovieId, ShowId, ShowtimeError, ShowtimeResult, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Seat label -> holder. A label that is present is reserved, absent is free.
pub type OccupiedSeats = BTreeMap<String, UserId>;

/// A scheduled screening of a movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    pub id: ShowId,
    pub movie_id: MovieId,
    pub show_date_time: DateTime<Utc>,
    /// Seat price in minor currency units.
    pub show_price: i64,
    pub occupied_seats: OccupiedSeats,
    /// Bumped on every persisted change to `occupied_seats`.
    #[serde(skip)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Show {
    /// Creates a show with no occupied seats.
    #[must_use]
    pub fn new(movie_id: MovieId, show_date_time: DateTime<Utc>, show_price: i64) -> Self {
        Self {
            id: ShowId::new(),
            movie_id,
            show_date_time,
            show_price,
            occupied_seats: OccupiedSeats::new(),
            version: 0,
            created_at: Utc::now(),
        }
    }

    /// Returns true if nobody holds `label`.
    #[must_use]
    pub fn is_free(&self, label: &str) -> bool {
        !self.occupied_seats.contains_key(label)
    }

    /// Marks every label in `labels` as held by `holder`.
    ///
    /// All-or-nothing: if any label is already taken, or listed twice,
    /// nothing is changed.
    pub fn claim_seats(&mut self, labels: &[String], holder: &UserId) -> ShowtimeResult<()> {
        let mut seen = BTreeSet::new();
        for label in labels {
            if !seen.insert(label.as_str()) {
                return Err(ShowtimeError::validation(format!(
                    "Seat {label} selected more than once"
                )));
            }
            if !self.is_free(label) {
                return Err(ShowtimeError::conflict(format!(
                    "Seat {label} is already booked"
                )));
            }
        }

        for label in labels {
            self.occupied_seats.insert(label.clone(), holder.clone());
        }
        Ok(())
    }

    /// Frees the labels in `labels` that are currently held by `holder`.
    ///
    /// Labels that are absent, or that belong to someone else, are left
    /// alone. Returns the labels actually freed.
    pub fn release_seats(&mut self, labels: &[String], holder: &UserId) -> Vec<String> {
        let mut released = Vec::new();
        for label in labels {
            if self.occupied_seats.get(label) == Some(holder) {
                self.occupied_seats.remove(label);
                released.push(label.clone());
            }
        }
        released
    }

    /// Distinct users holding at least one seat.
    #[must_use]
    pub fn holders(&self) -> BTreeSet<UserId> {
        self.occupied_seats.values().cloned().collect()
    }

    /// Labels of all occupied seats.
    #[must_use]
    pub fn occupied_labels(&self) -> Vec<String> {
        self.occupied_seats.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show() -> Show {
        Show::new(MovieId::new("550"), Utc::now(), 1200)
    }

    fn seats(labels: &[&str]) -> Vec<String> {
        labels.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_claim_marks_every_label() {
        let mut show = show();
        let u1 = UserId::new("U1");
        show.claim_seats(&seats(&["A1", "A2"]), &u1).unwrap();

        assert_eq!(show.occupied_seats.get("A1"), Some(&u1));
        assert_eq!(show.occupied_seats.get("A2"), Some(&u1));
    }

    #[test]
    fn test_claim_is_all_or_nothing() {
        let mut show = show();
        show.claim_seats(&seats(&["A2"]), &UserId::new("U1")).unwrap();

        let err = show
            .claim_seats(&seats(&["A1", "A2"]), &UserId::new("U2"))
            .unwrap_err();

        assert_eq!(err.status_code(), 409);
        assert!(show.is_free("A1"));
    }

    #[test]
    fn test_claim_rejects_duplicate_labels() {
        let mut show = show();
        let err = show
            .claim_seats(&seats(&["A1", "A1"]), &UserId::new("U1"))
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(show.occupied_seats.is_empty());
    }

    #[test]
    fn test_release_only_touches_own_holds() {
        let mut show = show();
        let u1 = UserId::new("U1");
        let u2 = UserId::new("U2");
        show.claim_seats(&seats(&["A1"]), &u1).unwrap();
        show.claim_seats(&seats(&["A2"]), &u2).unwrap();

        let released = show.release_seats(&seats(&["A1", "A2", "A3"]), &u1);

        assert_eq!(released, seats(&["A1"]));
        assert!(show.is_free("A1"));
        assert_eq!(show.occupied_seats.get("A2"), Some(&u2));
    }

    #[test]
    fn test_holders_are_distinct() {
        let mut show = show();
        show.claim_seats(&seats(&["A1", "A2"]), &UserId::new("U1")).unwrap();
        show.claim_seats(&seats(&["B1"]), &UserId::new("U2")).unwrap();

        assert_eq!(show.holders().len(), 2);
    }
}
