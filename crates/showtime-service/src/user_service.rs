//! Favorites and roles kept on the identity provider.

use crate::dto::FavoriteToggled;
use crate::identity::IdentityProvider;
use crate::repositories::Repositories;
use showtime_core::{Movie, MovieId, ShowtimeResult, UserId};
use std::sync::Arc;
use tracing::{debug, info};

pub struct UserService {
    repos: Repositories,
    identity: Arc<dyn IdentityProvider>,
}

impl UserService {
    pub fn new(repos: Repositories, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { repos, identity }
    }

    /// Adds the movie to the user's favorites, or removes it if present.
    pub async fn toggle_favorite(
        &self,
        user_id: &UserId,
        movie_id: &MovieId,
    ) -> ShowtimeResult<FavoriteToggled> {
        let mut metadata = self.identity.private_metadata(user_id).await?;
        let favorite = metadata.toggle_favorite(movie_id.as_str());
        self.identity
            .update_private_metadata(user_id, &metadata)
            .await?;

        info!(user_id = %user_id, movie_id = %movie_id, favorite, "Favorite toggled");
        Ok(FavoriteToggled {
            favorite,
            message: if favorite {
                "Added to favorites.".to_string()
            } else {
                "Removed from favorites.".to_string()
            },
        })
    }

    /// Movies in the user's favorites that exist locally.
    pub async fn favorites(&self, user_id: &UserId) -> ShowtimeResult<Vec<Movie>> {
        let metadata = self.identity.private_metadata(user_id).await?;
        let ids: Vec<MovieId> = metadata.favorites.into_iter().map(MovieId::from).collect();
        self.repos.movies.find_by_ids(&ids).await
    }

    /// Whether the identity provider grants the user the admin role.
    pub async fn is_admin(&self, user_id: &UserId) -> ShowtimeResult<bool> {
        let admin = self.identity.private_metadata(user_id).await?.is_admin();
        debug!(user_id = %user_id, admin, "Checked admin role");
        Ok(admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{MockIdentityProvider, PrivateMetadata};
    use crate::testing::{movie, InMemoryStore};

    #[tokio::test]
    async fn test_toggle_adds_then_reports_message() {
        let store = InMemoryStore::new();
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_private_metadata()
            .returning(|_| Ok(PrivateMetadata::default()));
        identity
            .expect_update_private_metadata()
            .withf(|_, metadata| metadata.favorites == vec!["550".to_string()])
            .times(1)
            .returning(|_, _| Ok(()));

        let service = UserService::new(store.repositories(), Arc::new(identity));
        let toggled = service
            .toggle_favorite(&UserId::new("U1"), &MovieId::new("550"))
            .await
            .unwrap();

        assert!(toggled.favorite);
        assert_eq!(toggled.message, "Added to favorites.");
    }

    #[tokio::test]
    async fn test_toggle_removes_existing_favorite() {
        let store = InMemoryStore::new();
        let mut identity = MockIdentityProvider::new();
        identity.expect_private_metadata().returning(|_| {
            Ok(PrivateMetadata {
                favorites: vec!["550".into()],
                ..PrivateMetadata::default()
            })
        });
        identity
            .expect_update_private_metadata()
            .withf(|_, metadata| metadata.favorites.is_empty())
            .returning(|_, _| Ok(()));

        let service = UserService::new(store.repositories(), Arc::new(identity));
        let toggled = service
            .toggle_favorite(&UserId::new("U1"), &MovieId::new("550"))
            .await
            .unwrap();

        assert!(!toggled.favorite);
        assert_eq!(toggled.message, "Removed from favorites.");
    }

    #[tokio::test]
    async fn test_favorites_resolve_known_movies() {
        let store = InMemoryStore::new();
        store.movies.insert(movie("550", "Fight Club"));
        let mut identity = MockIdentityProvider::new();
        identity.expect_private_metadata().returning(|_| {
            Ok(PrivateMetadata {
                favorites: vec!["550".into(), "999".into()],
                ..PrivateMetadata::default()
            })
        });

        let service = UserService::new(store.repositories(), Arc::new(identity));
        let movies = service.favorites(&UserId::new("U1")).await.unwrap();

        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].title, "Fight Club");
    }

    #[tokio::test]
    async fn test_admin_role() {
        let mut identity = MockIdentityProvider::new();
        identity.expect_private_metadata().returning(|_| {
            Ok(PrivateMetadata {
                role: Some("admin".into()),
                ..PrivateMetadata::default()
            })
        });

        let service = UserService::new(InMemoryStore::new().repositories(), Arc::new(identity));
        assert!(service.is_admin(&UserId::new("U1")).await.unwrap());
    }
}
