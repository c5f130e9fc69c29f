//! User entity, a local mirror of the identity provider's user.

use crate::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Locally cached user record. The identity provider stays authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// External identity id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Primary email address.
    pub email: String,
    /// Avatar URL.
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a user record stamped with the current time.
    #[must_use]
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        email: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            email: email.into(),
            image: image.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites the mirrored fields, last write wins.
    pub fn apply_profile(&mut self, name: String, email: String, image: String) {
        self.name = name;
        self.email = email;
        self.image = image;
        self.updated_at = Utc::now();
    }
}
