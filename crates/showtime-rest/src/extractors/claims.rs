//! Session claims extractors.

use crate::{responses::AppError, security::SessionClaims, state::AppState};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use showtime_core::{ShowtimeError, UserId};
use tracing::debug;

/// Extractor for the signed-in user.
///
/// Reads the claims the auth middleware stored; rejects with 401 when the
/// request carried no valid session token.
pub struct AuthenticatedUser(pub SessionClaims);

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.0.user_id()
    }
}

impl std::ops::Deref for AuthenticatedUser {
    type Target = SessionClaims;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionClaims>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or_else(|| AppError(ShowtimeError::unauthorized("Not authenticated")))
    }
}

/// Extractor for a signed-in user holding the admin role.
///
/// The role lives in the identity provider's private metadata, so this
/// costs one lookup per request.
pub struct AdminUser(pub SessionClaims);

impl AdminUser {
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.0.user_id()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(claims) = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !state.user_service.is_admin(&claims.user_id()).await? {
            debug!(user_id = %claims.sub, "Admin access denied");
            return Err(AppError(ShowtimeError::forbidden("Admin access required")));
        }

        Ok(AdminUser(claims))
    }
}
