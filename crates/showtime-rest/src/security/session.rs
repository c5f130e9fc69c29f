//! Clerk session token verification.

use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use showtime_config::IdentityConfig;
use showtime_core::{ShowtimeError, ShowtimeResult, UserId};
use tracing::{debug, warn};

/// Claims of a Clerk session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the Clerk user id.
    pub sub: String,
    /// Authorized party: the origin the token was minted for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,
    /// Session id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

impl SessionClaims {
    #[must_use]
    pub fn user_id(&self) -> UserId {
        UserId::new(self.sub.clone())
    }
}

/// Turns a bearer token into session claims.
pub trait SessionVerifier: Send + Sync {
    fn verify(&self, token: &str) -> ShowtimeResult<SessionClaims>;
}

/// Verifies RS256 session tokens against the instance's PEM public key.
pub struct ClerkSessionVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    authorized_parties: Vec<String>,
}

impl ClerkSessionVerifier {
    /// Builds the verifier from the identity configuration.
    ///
    /// Fails when no JWT public key is configured.
    pub fn new(config: &IdentityConfig) -> ShowtimeResult<Self> {
        let pem = config.jwt_public_key.as_deref().ok_or_else(|| {
            ShowtimeError::Configuration("identity.jwt_public_key is required".to_string())
        })?;
        Self::from_pem(pem, config.authorized_parties.clone())
    }

    /// Builds the verifier from a PEM public key.
    ///
    /// Literal `\n` sequences are accepted so the key can live in one
    /// environment variable.
    pub fn from_pem(pem: &str, authorized_parties: Vec<String>) -> ShowtimeResult<Self> {
        let pem = pem.replace("\\n", "\n");
        let decoding_key = DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
            ShowtimeError::Configuration(format!("Invalid JWT public key: {e}"))
        })?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.leeway = 5;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            decoding_key,
            validation,
            authorized_parties,
        })
    }
}

impl SessionVerifier for ClerkSessionVerifier {
    fn verify(&self, token: &str) -> ShowtimeResult<SessionClaims> {
        let claims = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!("Session token rejected: {}", e);
                match e.kind() {
                    ErrorKind::ExpiredSignature => {
                        ShowtimeError::unauthorized("Session token expired")
                    }
                    _ => ShowtimeError::unauthorized("Invalid session token"),
                }
            })?
            .claims;

        if !self.authorized_parties.is_empty() {
            let allowed = claims
                .azp
                .as_ref()
                .is_some_and(|azp| self.authorized_parties.contains(azp));
            if !allowed {
                warn!(azp = ?claims.azp, "Session token from unauthorized party");
                return Err(ShowtimeError::unauthorized("Unauthorized token party"));
            }
        }

        Ok(claims)
    }
}
