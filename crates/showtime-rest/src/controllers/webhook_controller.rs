//! Clerk webhook receiver.

use crate::{
    controllers::events_controller::{parse_event, publish, EventAccepted},
    responses::{ok, ApiResult, AppError},
    state::AppState,
};
use axum::{body::Bytes, extract::State, http::HeaderMap, routing::post, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use showtime_core::ShowtimeError;
use tracing::{debug, error};

/// Creates the webhook router, nested under `/webhooks`.
pub fn router() -> Router<AppState> {
    Router::new().route("/clerk", post(clerk_webhook))
}

/// Clerk webhook delivery.
#[derive(Debug, Deserialize)]
struct ClerkWebhook {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookReceipt {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventAccepted>,
}

const FORWARDED_TYPES: [&str; 3] = ["user.created", "user.updated", "user.deleted"];

/// Verifies the Svix signature and forwards user lifecycle events.
///
/// Event types other than `user.*` are acknowledged and dropped.
async fn clerk_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<WebhookReceipt> {
    let verifier = state.webhook_verifier.as_ref().ok_or_else(|| {
        error!("Clerk webhook received but no webhook secret is configured");
        AppError(ShowtimeError::Configuration(
            "Webhook secret not configured".to_string(),
        ))
    })?;
    verifier.verify(&headers, &body, Utc::now())?;

    let webhook: ClerkWebhook = serde_json::from_slice(&body)
        .map_err(|e| ShowtimeError::validation(format!("Invalid webhook payload: {e}")))?;

    if !FORWARDED_TYPES.contains(&webhook.event_type.as_str()) {
        debug!(event_type = %webhook.event_type, "Ignoring webhook type");
        return ok(WebhookReceipt {
            received: true,
            event: None,
        });
    }

    let event = parse_event(json!({
        "name": format!("clerk/{}", webhook.event_type),
        "data": webhook.data,
    }))?;

    ok(WebhookReceipt {
        received: true,
        event: Some(publish(&state, event).await?),
    })
}
