//! Identity provider integration.

mod clerk;

pub use clerk::ClerkClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use showtime_core::{ShowtimeResult, UserId};

/// Role value that grants admin access.
pub const ADMIN_ROLE: &str = "admin";

/// Server-only metadata kept on the identity provider's user record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrivateMetadata {
    #[serde(default)]
    pub favorites: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Keys this service does not manage, preserved on write.
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl PrivateMetadata {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }

    /// Adds `movie_id` to favorites if missing, removes it otherwise.
    ///
    /// Returns true if the movie is now a favorite.
    pub fn toggle_favorite(&mut self, movie_id: &str) -> bool {
        if let Some(pos) = self.favorites.iter().position(|id| id == movie_id) {
            self.favorites.remove(pos);
            false
        } else {
            self.favorites.push(movie_id.to_string());
            true
        }
    }
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn private_metadata(&self, user_id: &UserId) -> ShowtimeResult<PrivateMetadata>;

    async fn update_private_metadata(
        &self,
        user_id: &UserId,
        metadata: &PrivateMetadata,
    ) -> ShowtimeResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_favorite() {
        let mut metadata = PrivateMetadata::default();
        assert!(metadata.toggle_favorite("550"));
        assert_eq!(metadata.favorites, vec!["550".to_string()]);
        assert!(!metadata.toggle_favorite("550"));
        assert!(metadata.favorites.is_empty());
    }

    #[test]
    fn test_unknown_keys_survive_roundtrip() {
        let metadata: PrivateMetadata = serde_json::from_value(serde_json::json!({
            "role": "admin",
            "stripeCustomer": "cus_1"
        }))
        .unwrap();

        assert!(metadata.is_admin());
        assert!(metadata.favorites.is_empty());
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["stripeCustomer"], "cus_1");
    }
}
