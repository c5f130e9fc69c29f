//! Svix webhook signature verification.
//!
//! Clerk delivers webhooks through Svix. Each delivery carries `svix-id`,
//! `svix-timestamp` and `svix-signature` headers; the signature is
//! `v1,<base64 HMAC-SHA256(id.timestamp.body)>` keyed with the base64 part of
//! the `whsec_` secret. Several space-separated signatures may be present
//! during secret rotation.

use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use showtime_core::{ShowtimeError, ShowtimeResult};
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Deliveries older or newer than this are rejected.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

const SECRET_PREFIX: &str = "whsec_";

pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> ShowtimeResult<Self> {
        let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
        let key = STANDARD
            .decode(encoded)
            .map_err(|e| ShowtimeError::Configuration(format!("Invalid webhook secret: {e}")))?;
        if key.is_empty() {
            return Err(ShowtimeError::Configuration(
                "Webhook secret is empty".to_string(),
            ));
        }
        Ok(Self { key })
    }

    /// Checks the Svix headers of a delivery against its raw body.
    pub fn verify(&self, headers: &HeaderMap, body: &[u8], now: DateTime<Utc>) -> ShowtimeResult<()> {
        let id = header(headers, "svix-id")?;
        let timestamp = header(headers, "svix-timestamp")?;
        let signatures = header(headers, "svix-signature")?;

        let sent_at: i64 = timestamp
            .parse()
            .map_err(|_| ShowtimeError::unauthorized("Invalid webhook timestamp"))?;
        if (now.timestamp() - sent_at).abs() > TIMESTAMP_TOLERANCE_SECS {
            return Err(ShowtimeError::unauthorized(
                "Webhook timestamp outside tolerance",
            ));
        }

        let mac = self.mac(id, timestamp, body)?;
        let matched = signatures
            .split_whitespace()
            .filter_map(|s| s.strip_prefix("v1,"))
            .filter_map(|s| STANDARD.decode(s).ok())
            .any(|candidate| mac.clone().verify_slice(&candidate).is_ok());

        if matched {
            Ok(())
        } else {
            debug!(svix_id = %id, "Webhook signature mismatch");
            Err(ShowtimeError::unauthorized("Invalid webhook signature"))
        }
    }

    /// Produces the `v1,<signature>` value for a delivery.
    pub fn sign(&self, id: &str, timestamp: &str, body: &[u8]) -> ShowtimeResult<String> {
        let digest = self.mac(id, timestamp, body)?.finalize().into_bytes();
        Ok(format!("v1,{}", STANDARD.encode(digest)))
    }

    fn mac(&self, id: &str, timestamp: &str, body: &[u8]) -> ShowtimeResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| ShowtimeError::internal(format!("HMAC key rejected: {e}")))?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> ShowtimeResult<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ShowtimeError::unauthorized(format!("Missing {name} header")))
}
