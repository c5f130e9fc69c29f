//! Mirrors identity-provider users into the local user table.

use super::Workflows;
use showtime_core::{ClerkUserData, ShowtimeError, ShowtimeResult, User, UserId};
use tracing::{error, info, instrument};

impl Workflows {
    /// Builds the local record for an identity-provider payload.
    fn user_from_clerk(&self, data: &ClerkUserData) -> ShowtimeResult<User> {
        let email = data.primary_email().ok_or_else(|| {
            ShowtimeError::validation(format!("User {} has no email address", data.id))
        })?;
        let image = data
            .image_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(&self.config.default_avatar_url);

        Ok(User::new(
            UserId::new(data.id.as_str()),
            data.display_name(),
            email,
            image,
        ))
    }

    /// Handles `clerk/user.created`.
    ///
    /// A redelivered event finds the user already present and refreshes it
    /// instead of failing on the duplicate id.
    #[instrument(skip(self, data), fields(user_id = %data.id))]
    pub async fn sync_user_created(&self, data: &ClerkUserData) -> ShowtimeResult<User> {
        let user = self.user_from_clerk(data).map_err(|e| {
            error!(error = %e, "Rejected user.created payload");
            e
        })?;

        match self.repos.users.create(&user).await {
            Ok(created) => {
                info!("User created from identity provider");
                Ok(created)
            }
            Err(ShowtimeError::Conflict(_)) => {
                self.repos.users.update(&user).await?;
                info!("User already present, profile refreshed");
                Ok(user)
            }
            Err(e) => {
                error!(error = %e, "Failed to create user");
                Err(e)
            }
        }
    }

    /// Handles `clerk/user.updated`. Last write wins; unknown users are created.
    #[instrument(skip(self, data), fields(user_id = %data.id))]
    pub async fn sync_user_updated(&self, data: &ClerkUserData) -> ShowtimeResult<User> {
        let user = self.user_from_clerk(data)?;

        if self.repos.users.update(&user).await? {
            info!("User updated from identity provider");
            return Ok(user);
        }

        let created = self.repos.users.create(&user).await?;
        info!("User missing locally, created from update");
        Ok(created)
    }

    /// Handles `clerk/user.deleted`. Returns whether a local record existed.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn sync_user_deleted(&self, user_id: &UserId) -> ShowtimeResult<bool> {
        let existed = self.repos.users.delete(user_id).await?;
        info!(existed, "User deleted from identity provider");
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::MockMailer;
    use crate::testing::{user, InMemoryStore};
    use showtime_config::WorkflowConfig;
    use showtime_core::ClerkEmailAddress;
    use std::sync::Arc;

    fn workflows(store: &InMemoryStore) -> Workflows {
        Workflows::new(
            store.repositories(),
            Arc::new(MockMailer::new()),
            WorkflowConfig::default(),
        )
    }

    fn payload(id: &str, first: &str, last: &str, email: &str) -> ClerkUserData {
        ClerkUserData {
            id: id.into(),
            first_name: Some(first.into()),
            last_name: Some(last.into()),
            email_addresses: vec![ClerkEmailAddress {
                email_address: email.into(),
            }],
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_created_maps_fields_and_default_avatar() {
        let store = InMemoryStore::new();
        let wf = workflows(&store);

        wf.sync_user_created(&payload("U1", "Ada", "Lovelace", "ada@example.com"))
            .await
            .unwrap();

        let stored = store.users.get(&UserId::new("U1")).unwrap();
        assert_eq!(stored.name, "Ada Lovelace");
        assert_eq!(stored.email, "ada@example.com");
        assert_eq!(stored.image, WorkflowConfig::default().default_avatar_url);
    }

    #[tokio::test]
    async fn test_created_without_email_is_rejected() {
        let store = InMemoryStore::new();
        let wf = workflows(&store);
        let mut data = payload("U1", "Ada", "Lovelace", "ada@example.com");
        data.email_addresses.clear();

        let err = wf.sync_user_created(&data).await.unwrap_err();

        assert_eq!(err.status_code(), 400);
        assert!(!err.is_retriable());
        assert!(store.users.is_empty());
    }

    #[tokio::test]
    async fn test_redelivered_create_is_idempotent() {
        let store = InMemoryStore::new();
        let wf = workflows(&store);
        let data = payload("U1", "Ada", "Lovelace", "ada@example.com");

        wf.sync_user_created(&data).await.unwrap();
        wf.sync_user_created(&data).await.unwrap();

        assert_eq!(store.users.len(), 1);
    }

    #[tokio::test]
    async fn test_updated_overwrites_profile() {
        let store = InMemoryStore::new();
        store.users.insert(user("U1", "Old Name"));
        let wf = workflows(&store);
        let mut data = payload("U1", "Grace", "Hopper", "grace@example.com");
        data.image_url = Some("https://img.example.com/g.png".into());

        wf.sync_user_updated(&data).await.unwrap();

        let stored = store.users.get(&UserId::new("U1")).unwrap();
        assert_eq!(stored.name, "Grace Hopper");
        assert_eq!(stored.email, "grace@example.com");
        assert_eq!(stored.image, "https://img.example.com/g.png");
    }

    #[tokio::test]
    async fn test_updated_creates_missing_user() {
        let store = InMemoryStore::new();
        let wf = workflows(&store);

        wf.sync_user_updated(&payload("U2", "Alan", "Turing", "alan@example.com"))
            .await
            .unwrap();

        assert!(store.users.get(&UserId::new("U2")).is_some());
    }

    #[tokio::test]
    async fn test_deleted_leaves_no_record_regardless_of_prior_state() {
        let store = InMemoryStore::new();
        store.users.insert(user("U1", "Ada"));
        let wf = workflows(&store);
        let id = UserId::new("U1");

        assert!(wf.sync_user_deleted(&id).await.unwrap());
        assert!(!wf.sync_user_deleted(&id).await.unwrap());
        assert!(store.users.get(&id).is_none());
    }
}
