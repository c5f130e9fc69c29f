//! Health check controller.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status.
    pub status: String,
    /// Application version.
    pub version: String,
}

/// Readiness of each dependency.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub database: DependencyStatus,
    pub redis: DependencyStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    Up,
    Down,
    /// Not wired into this instance.
    Skipped,
}

/// Creates the health router, nested under `/health`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
}

/// Health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check: pings MySQL and Redis.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.database {
        Some(pool) => match pool.health_check().await {
            Ok(()) => DependencyStatus::Up,
            Err(e) => {
                warn!(error = %e, "Database not ready");
                DependencyStatus::Down
            }
        },
        None => DependencyStatus::Skipped,
    };

    let redis = match state.job_queue.health_check().await {
        Ok(()) => DependencyStatus::Up,
        Err(e) => {
            warn!(error = %e, "Redis not ready");
            DependencyStatus::Down
        }
    };

    let ready = database != DependencyStatus::Down && redis != DependencyStatus::Down;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            status: if ready { "ready" } else { "not_ready" }.to_string(),
            database,
            redis,
        }),
    )
}

/// Liveness check endpoint.
pub async fn liveness_check() -> impl IntoResponse {
    StatusCode::OK
}
