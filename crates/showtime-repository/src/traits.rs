//! Repository trait definitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use showtime_core::{
    Booking, BookingId, Movie, MovieId, Show, ShowId, ShowtimeResult, User, UserId,
};

/// Local mirror of identity-provider users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user by id.
    async fn find_by_id(&self, id: &UserId) -> ShowtimeResult<Option<User>>;

    /// Returns every user.
    async fn find_all(&self) -> ShowtimeResult<Vec<User>>;

    /// Returns the users among `ids` that exist.
    async fn find_by_ids(&self, ids: &[UserId]) -> ShowtimeResult<Vec<User>>;

    /// Inserts a new user. Fails with `Conflict` if the id exists.
    async fn create(&self, user: &User) -> ShowtimeResult<User>;

    /// Overwrites name, email and image. Returns false if no such user.
    async fn update(&self, user: &User) -> ShowtimeResult<bool>;

    /// Deletes by id. Returns false if nothing was deleted.
    async fn delete(&self, id: &UserId) -> ShowtimeResult<bool>;
}

/// Movie catalogue.
#[async_trait]
pub trait MovieRepository: Send + Sync {
    /// Finds a movie by id.
    async fn find_by_id(&self, id: &MovieId) -> ShowtimeResult<Option<Movie>>;

    /// Returns the movies among `ids` that exist.
    async fn find_by_ids(&self, ids: &[MovieId]) -> ShowtimeResult<Vec<Movie>>;

    /// Inserts or replaces a movie.
    async fn save(&self, movie: &Movie) -> ShowtimeResult<Movie>;
}

/// Screenings and their seat maps.
#[async_trait]
pub trait ShowRepository: Send + Sync {
    /// Finds a show by id.
    async fn find_by_id(&self, id: ShowId) -> ShowtimeResult<Option<Show>>;

    /// Returns the shows among `ids` that exist.
    async fn find_by_ids(&self, ids: &[ShowId]) -> ShowtimeResult<Vec<Show>>;

    /// Shows starting at or after `from`, earliest first.
    async fn find_upcoming(&self, from: DateTime<Utc>) -> ShowtimeResult<Vec<Show>>;

    /// Shows of one movie starting at or after `from`, earliest first.
    async fn find_upcoming_for_movie(
        &self,
        movie_id: &MovieId,
        from: DateTime<Utc>,
    ) -> ShowtimeResult<Vec<Show>>;

    /// Shows starting in `[from, to)`.
    async fn find_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ShowtimeResult<Vec<Show>>;

    /// Inserts new shows.
    async fn create_many(&self, shows: &[Show]) -> ShowtimeResult<()>;

    /// Persists `show.occupied_seats` if the stored version still equals
    /// `show.version`, bumping the version.
    ///
    /// Returns false when another writer got there first; the caller
    /// should reload and retry.
    async fn update_seats(&self, show: &Show) -> ShowtimeResult<bool>;
}

/// Bookings.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Finds a booking by id.
    async fn find_by_id(&self, id: BookingId) -> ShowtimeResult<Option<Booking>>;

    /// A user's bookings, newest first.
    async fn find_by_user(&self, user_id: &UserId) -> ShowtimeResult<Vec<Booking>>;

    /// Inserts a booking.
    async fn create(&self, booking: &Booking) -> ShowtimeResult<Booking>;

    /// Persists `is_paid` and `payment_link` of a booking that is still
    /// unpaid. Returns false if the booking is gone or already paid.
    async fn update_payment(&self, booking: &Booking) -> ShowtimeResult<bool>;

    /// Deletes by id. Returns false if nothing was deleted.
    async fn delete(&self, id: BookingId) -> ShowtimeResult<bool>;

    /// Deletes the booking only while it is unpaid. Returns false if it is
    /// gone or was paid first.
    async fn delete_unpaid(&self, id: BookingId) -> ShowtimeResult<bool>;
}
