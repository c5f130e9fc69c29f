//! MySQL booking repository implementation.

use super::parse_uuid;
use crate::{traits::BookingRepository, DatabasePool};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use showtime_core::{Booking, BookingId, ShowId, ShowtimeError, ShowtimeResult, UserId};
use sqlx::types::Json;
use sqlx::FromRow;
use tracing::debug;

const SELECT_BOOKING: &str = "SELECT id, user_id, show_id, amount, booked_seats, is_paid, \
     payment_link, created_at, updated_at FROM bookings";

/// MySQL booking repository implementation.
#[derive(Clone)]
pub struct MySqlBookingRepository {
    pool: DatabasePool,
}

impl MySqlBookingRepository {
    /// Creates a new MySQL booking repository.
    #[must_use]
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct BookingRow {
    id: String,
    user_id: String,
    show_id: String,
    amount: i64,
    booked_seats: Json<Vec<String>>,
    is_paid: bool,
    payment_link: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = ShowtimeError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: BookingId::from(parse_uuid("bookings.id", &row.id)?),
            user_id: UserId::new(row.user_id),
            show_id: ShowId::from(parse_uuid("bookings.show_id", &row.show_id)?),
            amount: row.amount,
            booked_seats: row.booked_seats.0,
            is_paid: row.is_paid,
            payment_link: row.payment_link,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl BookingRepository for MySqlBookingRepository {
    async fn find_by_id(&self, id: BookingId) -> ShowtimeResult<Option<Booking>> {
        debug!(booking_id = %id, "Finding booking by id");

        let row = sqlx::query_as::<_, BookingRow>(&format!("{SELECT_BOOKING} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(self.pool.inner())
            .await?;

        row.map(Booking::try_from).transpose()
    }

    async fn find_by_user(&self, user_id: &UserId) -> ShowtimeResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "{SELECT_BOOKING} WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id.as_str())
        .fetch_all(self.pool.inner())
        .await?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn create(&self, booking: &Booking) -> ShowtimeResult<Booking> {
        debug!(booking_id = %booking.id, show_id = %booking.show_id, "Creating booking");

        sqlx::query(
            r"
            INSERT INTO bookings (id, user_id, show_id, amount, booked_seats, is_paid,
                                  payment_link, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(booking.id.to_string())
        .bind(booking.user_id.as_str())
        .bind(booking.show_id.to_string())
        .bind(booking.amount)
        .bind(Json(&booking.booked_seats))
        .bind(booking.is_paid)
        .bind(&booking.payment_link)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(self.pool.inner())
        .await?;

        Ok(booking.clone())
    }

    async fn update_payment(&self, booking: &Booking) -> ShowtimeResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE bookings SET is_paid = ?, payment_link = ?, updated_at = ?
            WHERE id = ? AND is_paid = FALSE
            ",
        )
        .bind(booking.is_paid)
        .bind(&booking.payment_link)
        .bind(booking.updated_at)
        .bind(booking.id.to_string())
        .execute(self.pool.inner())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: BookingId) -> ShowtimeResult<bool> {
        debug!(booking_id = %id, "Deleting booking");

        let result = sqlx::query("DELETE FROM bookings WHERE id = ?")
            .bind(id.to_string())
            .execute(self.pool.inner())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_unpaid(&self, id: BookingId) -> ShowtimeResult<bool> {
        debug!(booking_id = %id, "Deleting unpaid booking");

        let result = sqlx::query("DELETE FROM bookings WHERE id = ? AND is_paid = FALSE")
            .bind(id.to_string())
            .execute(self.pool.inner())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
