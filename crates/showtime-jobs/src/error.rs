//! Job error types.

use showtime_core::ShowtimeError;
use thiserror::Error;

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Job-related errors.
#[derive(Debug, Error)]
pub enum JobError {
    /// Job execution failed with a transient error.
    #[error("Job execution failed: {0}")]
    ExecutionFailed(String),

    /// Job execution failed in a way another attempt cannot fix.
    #[error("Job rejected: {0}")]
    Rejected(String),

    /// Job was cancelled.
    #[error("Job was cancelled")]
    Cancelled,

    /// Job timed out.
    #[error("Job timed out after {0} seconds")]
    Timeout(u64),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Redis pool error.
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Job not found.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// Invalid job state.
    #[error("Invalid job state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// A pending job already holds this unique key.
    #[error("Duplicate job with unique key: {0}")]
    Duplicate(String),

    /// Worker error.
    #[error("Worker error: {0}")]
    Worker(String),

    /// Scheduler error.
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl JobError {
    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ExecutionFailed(_)
                | Self::Timeout(_)
                | Self::Redis(_)
                | Self::Pool(_)
                | Self::Worker(_)
        )
    }

    /// Returns true if the job should go straight to the dead letter queue.
    #[must_use]
    pub const fn should_dlq(&self) -> bool {
        matches!(
            self,
            Self::Rejected(_) | Self::Serialization(_) | Self::Configuration(_)
        )
    }

    /// Short label used in metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ExecutionFailed(_) => "execution_failed",
            Self::Rejected(_) => "rejected",
            Self::Cancelled => "cancelled",
            Self::Timeout(_) => "timeout",
            Self::Serialization(_) => "serialization",
            Self::Redis(_) | Self::Pool(_) => "redis",
            Self::NotFound(_) => "not_found",
            Self::InvalidState { .. } => "invalid_state",
            Self::Duplicate(_) => "duplicate",
            Self::Worker(_) => "worker",
            Self::Scheduler(_) => "scheduler",
            Self::Configuration(_) => "configuration",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<ShowtimeError> for JobError {
    fn from(err: ShowtimeError) -> Self {
        if err.is_retriable() {
            Self::ExecutionFailed(err.to_string())
        } else {
            Self::Rejected(err.to_string())
        }
    }
}

impl From<JobError> for ShowtimeError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(id) => Self::not_found("Job", id),
            JobError::InvalidState { .. } | JobError::Duplicate(_) => Self::conflict(err.to_string()),
            JobError::Redis(_) | JobError::Pool(_) => Self::Cache(err.to_string()),
            JobError::Configuration(msg) => Self::Configuration(msg),
            other => Self::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable_execution_failed() {
        assert!(JobError::ExecutionFailed("oops".into()).is_retryable());
        assert!(JobError::Timeout(30).is_retryable());
        assert!(JobError::Worker("crash".into()).is_retryable());
    }

    #[test]
    fn test_is_not_retryable() {
        assert!(!JobError::Cancelled.is_retryable());
        assert!(!JobError::NotFound("job-123".into()).is_retryable());
        assert!(!JobError::Rejected("bad payload".into()).is_retryable());
        assert!(!JobError::Duplicate("booking-1".into()).is_retryable());
    }

    #[test]
    fn test_should_dlq() {
        assert!(JobError::Rejected("missing email".into()).should_dlq());
        assert!(JobError::Configuration("no handler".into()).should_dlq());
        assert!(!JobError::ExecutionFailed("transient".into()).should_dlq());
    }

    #[test]
    fn test_from_showtime_error_keeps_retryability() {
        let transient = JobError::from(ShowtimeError::Database("connection reset".into()));
        assert!(transient.is_retryable());

        let permanent = JobError::from(ShowtimeError::validation("no email addresses"));
        assert!(!permanent.is_retryable());
        assert!(permanent.should_dlq());
    }

    #[test]
    fn test_into_showtime_error() {
        let err: ShowtimeError = JobError::NotFound("abc".into()).into();
        assert_eq!(err.status_code(), 404);

        let err: ShowtimeError = JobError::InvalidState {
            expected: "pending".into(),
            actual: "running".into(),
        }
        .into();
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn test_error_display_invalid_state() {
        let err = JobError::InvalidState {
            expected: "ready".into(),
            actual: "done".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ready") && msg.contains("done"));
    }
}
