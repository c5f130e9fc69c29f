//! # Showtime Service
//!
//! Application services behind the HTTP surface and the background
//! workflows run by the job engine.
//!
//! - [`BookingService`], [`ShowService`] and [`UserService`] serve requests.
//! - [`workflows`] holds seat release, user sync and notifications.
//! - [`events`] turns application events into jobs.

pub mod booking_service;
pub mod dto;
pub mod events;
pub mod identity;
pub mod jobs;
pub mod mailer;
pub mod repositories;
pub mod show_service;
pub mod user_service;
pub mod validation;
pub mod workflows;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use booking_service::BookingService;
pub use dto::*;
pub use events::{EventBus, QueueEventBus};
pub use identity::{ClerkClient, IdentityProvider, PrivateMetadata};
pub use mailer::{Mailer, SmtpMailer};
pub use repositories::Repositories;
pub use show_service::ShowService;
pub use user_service::UserService;
pub use validation::ValidateExt;
pub use workflows::{DeliveryReport, ReleaseOutcome, Workflows};
