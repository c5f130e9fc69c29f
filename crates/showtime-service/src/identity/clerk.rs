//! Clerk Backend API client.

use super::{IdentityProvider, PrivateMetadata};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use showtime_config::IdentityConfig;
use showtime_core::{ShowtimeError, ShowtimeResult, UserId};
use tracing::{debug, warn};

const SERVICE: &str = "clerk";

#[derive(Debug, Deserialize)]
struct ClerkUser {
    #[serde(default)]
    private_metadata: PrivateMetadata,
}

#[derive(Debug, Serialize)]
struct MetadataUpdate<'a> {
    private_metadata: &'a PrivateMetadata,
}

/// Reads and writes user metadata through the Clerk Backend API.
#[derive(Clone)]
pub struct ClerkClient {
    client: reqwest::Client,
    api_url: String,
    secret_key: String,
}

impl ClerkClient {
    pub fn new(config: &IdentityConfig) -> ShowtimeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ShowtimeError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    fn user_url(&self, user_id: &UserId) -> String {
        format!("{}/users/{}", self.api_url, user_id)
    }

    async fn ensure_success(response: reqwest::Response) -> ShowtimeResult<reqwest::Response> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ShowtimeError::not_found("IdentityUser", response.url().path()));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            warn!(status = status.as_u16(), body = %body, "Clerk API request failed");
            return Err(ShowtimeError::external(
                SERVICE,
                format!("status {status}: {body}"),
            ));
        }
        Ok(response)
    }
}

fn transport_error(e: &reqwest::Error) -> ShowtimeError {
    ShowtimeError::external(SERVICE, e.to_string())
}

#[async_trait]
impl IdentityProvider for ClerkClient {
    async fn private_metadata(&self, user_id: &UserId) -> ShowtimeResult<PrivateMetadata> {
        debug!(user_id = %user_id, "Fetching private metadata");

        let response = self
            .client
            .get(self.user_url(user_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let user: ClerkUser = Self::ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| transport_error(&e))?;
        Ok(user.private_metadata)
    }

    async fn update_private_metadata(
        &self,
        user_id: &UserId,
        metadata: &PrivateMetadata,
    ) -> ShowtimeResult<()> {
        debug!(user_id = %user_id, "Updating private metadata");

        let response = self
            .client
            .patch(format!("{}/metadata", self.user_url(user_id)))
            .bearer_auth(&self.secret_key)
            .json(&MetadataUpdate {
                private_metadata: metadata,
            })
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ClerkClient {
        ClerkClient::new(&IdentityConfig {
            api_url: server.uri(),
            secret_key: "sk_test_123".into(),
            ..IdentityConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_reads_private_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/user_1"))
            .and(header("authorization", "Bearer sk_test_123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user_1",
                "private_metadata": { "favorites": ["550"], "role": "admin" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let metadata = client(&server)
            .private_metadata(&UserId::new("user_1"))
            .await
            .unwrap();

        assert_eq!(metadata.favorites, vec!["550".to_string()]);
        assert!(metadata.is_admin());
    }

    #[tokio::test]
    async fn test_missing_metadata_defaults_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/user_2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "user_2" })))
            .mount(&server)
            .await;

        let metadata = client(&server)
            .private_metadata(&UserId::new("user_2"))
            .await
            .unwrap();
        assert_eq!(metadata, PrivateMetadata::default());
    }

    #[tokio::test]
    async fn test_patches_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/users/user_1/metadata"))
            .and(body_json(json!({ "private_metadata": { "favorites": ["550", "680"] } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "user_1" })))
            .expect(1)
            .mount(&server)
            .await;

        let metadata = PrivateMetadata {
            favorites: vec!["550".into(), "680".into()],
            ..PrivateMetadata::default()
        };
        client(&server)
            .update_private_metadata(&UserId::new("user_1"), &metadata)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_server_error_is_retriable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let err = client(&server)
            .private_metadata(&UserId::new("user_1"))
            .await
            .unwrap_err();
        assert!(err.is_retriable());
        assert_eq!(err.status_code(), 502);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server)
            .private_metadata(&UserId::new("user_9"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
