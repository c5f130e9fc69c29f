//! # Showtime Repository
//!
//! Persistence for users, movies, shows and bookings. The traits in
//! [`traits`] are what the service layer depends on; [`mysql`] holds the
//! SQLx implementations.

pub mod mysql;
mod pool;
pub mod traits;

pub use mysql::*;
pub use pool::*;
pub use traits::*;
