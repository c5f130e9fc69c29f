//! Authentication middleware.

use crate::security::SessionVerifier;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use std::sync::Arc;
use tracing::debug;

/// Authentication middleware state.
#[derive(Clone)]
pub struct AuthMiddlewareState {
    pub verifier: Arc<dyn SessionVerifier>,
}

impl AuthMiddlewareState {
    pub fn new(verifier: Arc<dyn SessionVerifier>) -> Self {
        Self { verifier }
    }
}

/// Validates the bearer session token and stores its claims in the request
/// extensions.
///
/// Requests without a valid token pass through unauthenticated; handlers
/// that need a user reject them through the extractors.
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let bearer = request.headers().typed_get::<Authorization<Bearer>>();

    if let Some(Authorization(bearer)) = bearer {
        match state.verifier.verify(bearer.token()) {
            Ok(claims) => {
                debug!(user_id = %claims.sub, "Authenticated session");
                request.extensions_mut().insert(claims);
            }
            Err(e) => {
                debug!("Session token validation failed: {}", e);
            }
        }
    }

    next.run(request).await
}
