//! # Showtime REST
//!
//! REST API layer using Axum for Showtime.
//! Serves bookings, shows and favorites, ingests events and Clerk webhooks,
//! and exposes job administration and health checks.

pub mod controllers;
pub mod extractors;
pub mod middleware;
pub mod responses;
pub mod router;
pub mod security;
pub mod state;

pub use router::*;
pub use security::{ClerkSessionVerifier, SessionClaims, SessionVerifier, WebhookVerifier};
pub use state::*;
