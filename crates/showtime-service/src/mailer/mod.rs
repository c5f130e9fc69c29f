//! Outbound email.

mod smtp;
pub mod templates;

pub use smtp::SmtpMailer;

use async_trait::async_trait;
use showtime_core::ShowtimeResult;

/// Sends one HTML email per call.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> ShowtimeResult<()>;
}
