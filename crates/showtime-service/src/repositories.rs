//! Repository handles shared by services and workflows.

use showtime_repository::{
    BookingRepository, DatabasePool, MovieRepository, MySqlBookingRepository,
    MySqlMovieRepository, MySqlShowRepository, MySqlUserRepository, ShowRepository,
    UserRepository,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub movies: Arc<dyn MovieRepository>,
    pub shows: Arc<dyn ShowRepository>,
    pub bookings: Arc<dyn BookingRepository>,
}

impl Repositories {
    /// MySQL-backed repositories over one pool.
    #[must_use]
    pub fn mysql(pool: &DatabasePool) -> Self {
        Self {
            users: Arc::new(MySqlUserRepository::new(pool.clone())),
            movies: Arc::new(MySqlMovieRepository::new(pool.clone())),
            shows: Arc::new(MySqlShowRepository::new(pool.clone())),
            bookings: Arc::new(MySqlBookingRepository::new(pool.clone())),
        }
    }
}
