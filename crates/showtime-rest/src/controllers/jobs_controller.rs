//! Job administration controller (admin only).

use crate::{
    extractors::AdminUser,
    responses::{ok, ApiResult, AppError},
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use showtime_core::ShowtimeError;
use showtime_jobs::{JobId, JobInfo, ScheduledJobInfo};
use tracing::info;

/// Creates the jobs router, nested under `/jobs`.
pub fn router() -> Router<AppState> {
    Router::new()
        // Job operations
        .route("/:job_id", get(get_job).delete(cancel_job))
        // DLQ operations
        .route("/dlq", get(list_dlq))
        .route("/dlq/:job_id/retry", post(retry_dlq_job))
        // Queues
        .route("/queues/:queue", get(list_queue_jobs))
        // Scheduled jobs
        .route("/scheduled", get(list_scheduled_jobs))
        .route("/scheduled/:name/trigger", post(trigger_scheduled_job))
        .route("/scheduled/:name/enable", post(enable_scheduled_job))
        .route("/scheduled/:name/disable", post(disable_scheduled_job))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Pagination for job listings.
#[derive(Debug, Deserialize)]
pub struct JobListParams {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

const MAX_LIMIT: usize = 500;

impl JobListParams {
    fn limit(&self) -> usize {
        self.limit.clamp(1, MAX_LIMIT)
    }
}

/// Jobs waiting in one queue.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueJobsResponse {
    pub queue: String,
    pub length: u64,
    pub jobs: Vec<JobInfo>,
}

/// Simple message response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Handler Functions
// ============================================================================

async fn get_job(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(job_id): Path<String>,
) -> ApiResult<JobInfo> {
    let info = state
        .job_queue
        .get_job(&JobId::from(job_id.as_str()))
        .await?
        .ok_or_else(|| AppError(ShowtimeError::not_found("Job", &job_id)))?;
    ok(info)
}

/// Cancel a pending job.
async fn cancel_job(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(job_id): Path<String>,
) -> ApiResult<MessageResponse> {
    let job_id = JobId::from(job_id);
    state.job_queue.cancel(&job_id).await?;
    info!(job_id = %job_id, admin = %admin.0.sub, "Job cancelled");

    ok(MessageResponse {
        message: format!("Job {job_id} cancelled"),
    })
}

/// List dead letter queue jobs.
async fn list_dlq(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<JobListParams>,
) -> ApiResult<Vec<JobInfo>> {
    ok(state
        .job_queue
        .list_dlq(params.limit(), params.offset)
        .await?)
}

/// Move a job from the DLQ back to its queue.
async fn retry_dlq_job(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(job_id): Path<String>,
) -> ApiResult<MessageResponse> {
    let job_id = JobId::from(job_id);
    state.job_queue.retry_dlq(&job_id).await?;
    info!(job_id = %job_id, admin = %admin.0.sub, "DLQ job requeued");

    ok(MessageResponse {
        message: format!("DLQ job {job_id} queued for retry"),
    })
}

/// List jobs waiting in a queue.
async fn list_queue_jobs(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(queue): Path<String>,
    Query(params): Query<JobListParams>,
) -> ApiResult<QueueJobsResponse> {
    let length = state.job_queue.queue_length(&queue).await?;
    let jobs = state
        .job_queue
        .list_jobs(&queue, params.limit(), params.offset)
        .await?;

    ok(QueueJobsResponse {
        queue,
        length,
        jobs,
    })
}

/// List scheduled jobs.
async fn list_scheduled_jobs(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Vec<ScheduledJobInfo>> {
    ok(state.scheduler.list_jobs())
}

/// Trigger a scheduled job immediately.
async fn trigger_scheduled_job(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(name): Path<String>,
) -> ApiResult<MessageResponse> {
    let job_id = state.scheduler.trigger_job(&name).await?;
    info!(schedule = %name, job_id = %job_id, admin = %admin.0.sub, "Scheduled job triggered");

    ok(MessageResponse {
        message: format!("Scheduled job '{name}' triggered as {job_id}"),
    })
}

/// Enable a scheduled job.
async fn enable_scheduled_job(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(name): Path<String>,
) -> ApiResult<MessageResponse> {
    if !state.scheduler.enable_job(&name) {
        return Err(AppError(ShowtimeError::not_found("ScheduledJob", name)));
    }
    ok(MessageResponse {
        message: format!("Scheduled job '{name}' enabled"),
    })
}

/// Disable a scheduled job.
async fn disable_scheduled_job(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(name): Path<String>,
) -> ApiResult<MessageResponse> {
    if !state.scheduler.disable_job(&name) {
        return Err(AppError(ShowtimeError::not_found("ScheduledJob", name)));
    }
    ok(MessageResponse {
        message: format!("Scheduled job '{name}' disabled"),
    })
}
