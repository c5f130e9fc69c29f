//! # Showtime Core
//!
//! Core types, domain entities, and error definitions shared by every layer
//! of the Showtime booking backend.
//!
//! - [`ShowtimeError`] is the single error type crossing crate boundaries.
//! - [`domain`] holds the persisted records: users, movies, shows and bookings.
//! - [`events`] names the events that drive the background workflows.

pub mod domain;
pub mod error;
pub mod events;
pub mod id;
pub mod result;

pub use domain::*;
pub use error::*;
pub use events::*;
pub use id::*;
pub use result::*;
