//! Booking entity.

use crate::{BookingId, ShowId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's claim on a set of seats for one show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub show_id: ShowId,
    /// Total in minor currency units.
    pub amount: i64,
    /// Seat labels requested in this transaction.
    pub booked_seats: Vec<String>,
    pub is_paid: bool,
    #[serde(default)]
    pub payment_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Creates an unpaid booking.
    #[must_use]
    pub fn new(user_id: UserId, show_id: ShowId, amount: i64, booked_seats: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: BookingId::new(),
            user_id,
            show_id,
            amount,
            booked_seats,
            is_paid: false,
            payment_link: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the booking paid. Returns false if it already was.
    pub fn mark_paid(&mut self) -> bool {
        if self.is_paid {
            return false;
        }
        self.is_paid = true;
        self.payment_link = None;
        self.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_paid_is_idempotent() {
        let mut booking = Booking::new(UserId::new("U1"), ShowId::new(), 2400, vec!["A1".into()]);
        assert!(booking.mark_paid());
        assert!(!booking.mark_paid());
        assert!(booking.is_paid);
    }
}
