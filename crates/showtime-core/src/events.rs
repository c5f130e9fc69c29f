//! Events that trigger the background workflows.
//!
//! Events travel as `{ "name": "...", "data": { ... } }`, the same envelope
//! accepted by the ingestion endpoint.

use crate::BookingId;
use serde::{Deserialize, Serialize};

/// Event names.
pub mod names {
    pub const USER_CREATED: &str = "clerk/user.created";
    pub const USER_UPDATED: &str = "clerk/user.updated";
    pub const USER_DELETED: &str = "clerk/user.deleted";
    pub const CHECK_PAYMENT: &str = "app/checkpayment";
    pub const SHOW_BOOKED: &str = "app/show.booked";
    pub const SHOW_ADDED: &str = "app/show.added";
}

/// An email address entry of an identity-provider user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClerkEmailAddress {
    pub email_address: String,
}

/// User payload of the identity provider's lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClerkUserData {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<ClerkEmailAddress>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl ClerkUserData {
    /// `first_name + " " + last_name`, missing parts treated as empty.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }

    /// The first listed email address.
    #[must_use]
    pub fn primary_email(&self) -> Option<&str> {
        self.email_addresses
            .first()
            .map(|e| e.email_address.as_str())
    }
}

/// Payload of `clerk/user.deleted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClerkDeletedUser {
    pub id: String,
}

/// Payload carrying a booking reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRef {
    pub booking_id: BookingId,
}

/// Payload of `app/show.added`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowAdded {
    pub movie_title: String,
}

/// Every event the backend reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data")]
pub enum AppEvent {
    #[serde(rename = "clerk/user.created")]
    UserCreated(ClerkUserData),
    #[serde(rename = "clerk/user.updated")]
    UserUpdated(ClerkUserData),
    #[serde(rename = "clerk/user.deleted")]
    UserDeleted(ClerkDeletedUser),
    #[serde(rename = "app/checkpayment")]
    CheckPayment(BookingRef),
    #[serde(rename = "app/show.booked")]
    ShowBooked(BookingRef),
    #[serde(rename = "app/show.added")]
    ShowAdded(ShowAdded),
}

impl AppEvent {
    /// The wire name of this event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UserCreated(_) => names::USER_CREATED,
            Self::UserUpdated(_) => names::USER_UPDATED,
            Self::UserDeleted(_) => names::USER_DELETED,
            Self::CheckPayment(_) => names::CHECK_PAYMENT,
            Self::ShowBooked(_) => names::SHOW_BOOKED,
            Self::ShowAdded(_) => names::SHOW_ADDED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_checkpayment_envelope() {
        let id = BookingId::new();
        let event: AppEvent = serde_json::from_value(json!({
            "name": "app/checkpayment",
            "data": { "bookingId": id.to_string() }
        }))
        .unwrap();

        assert_eq!(event, AppEvent::CheckPayment(BookingRef { booking_id: id }));
        assert_eq!(event.name(), names::CHECK_PAYMENT);
    }

    #[test]
    fn test_parses_clerk_user_payload() {
        let event: AppEvent = serde_json::from_value(json!({
            "name": "clerk/user.created",
            "data": {
                "id": "user_1",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "email_addresses": [{ "email_address": "ada@example.com", "id": "idn_1" }],
                "image_url": "https://img.example.com/ada.png"
            }
        }))
        .unwrap();

        let AppEvent::UserCreated(data) = event else {
            panic!("expected user.created");
        };
        assert_eq!(data.display_name(), "Ada Lovelace");
        assert_eq!(data.primary_email(), Some("ada@example.com"));
    }

    #[test]
    fn test_unknown_event_name_is_rejected() {
        let result = serde_json::from_value::<AppEvent>(json!({
            "name": "app/unknown",
            "data": {}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_display_name_tolerates_missing_parts() {
        let data = ClerkUserData {
            id: "user_1".into(),
            first_name: Some("Ada".into()),
            last_name: None,
            email_addresses: vec![],
            image_url: None,
        };
        assert_eq!(data.display_name(), "Ada");
        assert_eq!(data.primary_email(), None);
    }
}
