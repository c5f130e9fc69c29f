//! Event ingestion.

use crate::{
    extractors::AdminUser,
    responses::{accepted, ApiResponse, AppError},
    state::AppState,
};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;
use serde_json::Value;
use showtime_core::{AppEvent, ShowtimeError};
use tracing::info;

/// Creates the events router.
pub fn router() -> Router<AppState> {
    Router::new().route("/events", post(ingest_event))
}

/// Outcome of publishing an event.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAccepted {
    pub name: String,
    /// `None` when an equivalent job was already pending.
    pub job_id: Option<String>,
}

/// Parses a `{ name, data }` envelope into a known event.
pub(crate) fn parse_event(envelope: Value) -> Result<AppEvent, ShowtimeError> {
    let name = envelope
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ShowtimeError::validation("Event name is required"))?;

    serde_json::from_value(envelope)
        .map_err(|e| ShowtimeError::validation(format!("Unsupported event '{name}': {e}")))
}

pub(crate) async fn publish(
    state: &AppState,
    event: AppEvent,
) -> Result<EventAccepted, AppError> {
    let name = event.name().to_string();
    let job_id = state.events.publish(event).await?;
    info!(event = %name, job_id = ?job_id, "Event accepted");

    Ok(EventAccepted {
        name,
        job_id: job_id.map(|id| id.to_string()),
    })
}

/// Routes a named event to its job (admin only).
async fn ingest_event(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(envelope): Json<Value>,
) -> Result<(StatusCode, Json<ApiResponse<EventAccepted>>), AppError> {
    let event = parse_event(envelope)?;
    Ok(accepted(publish(&state, event).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_event() {
        let event = parse_event(json!({
            "name": "app/show.added",
            "data": { "movieTitle": "Heat" }
        }))
        .unwrap();
        assert_eq!(event.name(), "app/show.added");
    }

    #[test]
    fn test_unknown_event_is_validation_error() {
        let err = parse_event(json!({ "name": "app/unknown", "data": {} })).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("app/unknown"));
    }

    #[test]
    fn test_missing_name() {
        let err = parse_event(json!({ "data": {} })).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
