//! # Showtime Server Library
//!
//! Wiring for the Showtime server: builds repositories, the job engine,
//! workflows and the HTTP router from configuration, and runs them until
//! shutdown.

pub mod app;
pub mod startup;
pub mod telemetry;

pub use app::Application;
