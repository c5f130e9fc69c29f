//! SMTP mailer on top of `lettre`.

use super::Mailer;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use showtime_config::EmailConfig;
use showtime_core::{ShowtimeError, ShowtimeResult};
use tracing::{debug, warn};

const SERVICE: &str = "smtp";

/// Mailer backed by a pooled async SMTP transport.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Builds the transport. No connection is opened until the first send.
    pub fn new(config: &EmailConfig) -> ShowtimeResult<Self> {
        let from: Mailbox = config.from_address.parse().map_err(|e| {
            ShowtimeError::Configuration(format!(
                "Invalid sender address '{}': {e}",
                config.from_address
            ))
        })?;

        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| ShowtimeError::Configuration(format!("Invalid SMTP relay: {e}")))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        }
        .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, to: &str, subject: &str, html_body: &str) -> ShowtimeResult<Message> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| ShowtimeError::validation(format!("Invalid recipient '{to}': {e}")))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| ShowtimeError::internal(format!("Failed to build email: {e}")))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> ShowtimeResult<()> {
        let message = self.build_message(to, subject, html_body)?;

        self.transport.send(message).await.map_err(|e| {
            warn!(to = %to, error = %e, "SMTP send failed");
            ShowtimeError::external(SERVICE, e.to_string())
        })?;

        debug!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            starttls: false,
            ..EmailConfig::default()
        }
    }

    #[test]
    fn test_rejects_bad_sender() {
        let config = EmailConfig {
            from_address: "not an address".into(),
            ..config()
        };
        let err = SmtpMailer::new(&config).err().unwrap();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_builds_html_message() {
        let mailer = SmtpMailer::new(&config()).unwrap();
        let message = mailer
            .build_message("ada@example.com", "Hello", "<p>Hi</p>")
            .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Hello"));
        assert!(raw.contains("text/html"));
    }

    #[test]
    fn test_bad_recipient_is_validation_error() {
        let mailer = SmtpMailer::new(&config()).unwrap();
        let err = mailer.build_message("nobody", "Hello", "<p>Hi</p>").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
