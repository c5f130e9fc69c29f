//! Job trait and the envelope stored in the queue.

use crate::error::JobResult;
use crate::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Unique job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Creates a new time-ordered job ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Execution context handed to a job handler.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_id: JobId,
    /// Current attempt number (1-based).
    pub attempt: u32,
    pub max_attempts: u32,
    pub queue: String,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub correlation_id: Option<String>,
    pub worker_id: String,
}

impl JobContext {
    /// Returns true if this is the last attempt.
    #[must_use]
    pub const fn is_last_attempt(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Returns remaining attempts.
    #[must_use]
    pub const fn remaining_attempts(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempt)
    }
}

/// A job payload type.
///
/// Implementors only describe the payload and how it is queued. The code
/// that runs it is registered on the worker pool with
/// [`WorkerPool::register`](crate::WorkerPool::register), so handlers can
/// capture whatever services they need.
pub trait Job: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Unique name for this job type; handlers are looked up by it.
    const NAME: &'static str;

    /// Queue this job is pushed to.
    const QUEUE: &'static str = "default";

    /// Retries after the first attempt.
    const MAX_RETRIES: u32 = 3;

    /// Execution timeout in seconds.
    const TIMEOUT_SECS: u64 = 300;

    /// Retry policy for this job.
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(Self::MAX_RETRIES)
    }

    /// Key that makes this job unique while pending. `None` allows duplicates.
    fn unique_key(&self) -> Option<String> {
        None
    }
}

/// Lifecycle state of a job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Ready in a queue.
    #[default]
    Pending,
    /// Waiting in the delayed set.
    Scheduled,
    /// Held by a worker.
    Running,
    Completed,
    DeadLetter,
    Cancelled,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::DeadLetter => "dead_letter",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Job record persisted by the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobData {
    pub id: JobId,
    /// Job type name.
    pub name: String,
    pub queue: String,
    /// JSON payload.
    pub payload: serde_json::Value,
    /// Runs started so far.
    pub attempt: u32,
    pub max_attempts: u32,
    pub timeout_secs: u64,
    pub created_at: DateTime<Utc>,
    /// Earliest time the job may run.
    pub scheduled_at: DateTime<Utc>,
    /// Higher runs first.
    pub priority: i8,
    pub status: JobStatus,
    pub correlation_id: Option<String>,
    pub retry_policy: RetryPolicy,
    pub unique_key: Option<String>,
    pub last_error: Option<String>,
}

impl JobData {
    /// Wraps a job payload in a fresh record.
    pub fn new<J: Job>(job: &J) -> JobResult<Self> {
        let now = Utc::now();
        let retry_policy = job.retry_policy();

        Ok(Self {
            id: JobId::new(),
            name: J::NAME.to_string(),
            queue: J::QUEUE.to_string(),
            payload: serde_json::to_value(job)?,
            attempt: 0,
            max_attempts: retry_policy.max_retries + 1,
            timeout_secs: J::TIMEOUT_SECS,
            created_at: now,
            scheduled_at: now,
            priority: 0,
            status: JobStatus::Pending,
            correlation_id: None,
            retry_policy,
            unique_key: job.unique_key(),
            last_error: None,
        })
    }

    /// Decodes the payload.
    pub fn payload<J: Job>(&self) -> JobResult<J> {
        Ok(J::deserialize(&self.payload)?)
    }

    pub fn increment_attempt(&mut self) {
        self.attempt += 1;
    }

    /// True once every allowed attempt has been used.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    pub fn set_error(&mut self, error: &impl fmt::Display) {
        self.last_error = Some(error.to_string());
    }

    /// Execution timeout, falling back to `default` when unset.
    #[must_use]
    pub const fn timeout_or(&self, default: Duration) -> Duration {
        if self.timeout_secs == 0 {
            default
        } else {
            Duration::from_secs(self.timeout_secs)
        }
    }

    /// Context for the run about to start.
    #[must_use]
    pub fn to_context(&self, worker_id: &str) -> JobContext {
        JobContext {
            job_id: self.id.clone(),
            attempt: self.attempt,
            max_attempts: self.max_attempts,
            queue: self.queue.clone(),
            scheduled_at: self.scheduled_at,
            started_at: Utc::now(),
            correlation_id: self.correlation_id.clone(),
            worker_id: worker_id.to_string(),
        }
    }

    pub fn to_json(&self) -> JobResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> JobResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Read model returned by job administration queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub id: JobId,
    pub name: String,
    pub queue: String,
    pub status: JobStatus,
    pub attempt: u32,
    pub max_attempts: u32,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: DateTime<Utc>,
    pub priority: i8,
    pub unique_key: Option<String>,
    pub last_error: Option<String>,
    /// Worker holding the job, if running.
    pub worker_id: Option<String>,
}

impl From<JobData> for JobInfo {
    fn from(data: JobData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            queue: data.queue,
            status: data.status,
            attempt: data.attempt,
            max_attempts: data.max_attempts,
            created_at: data.created_at,
            scheduled_at: data.scheduled_at,
            priority: data.priority,
            unique_key: data.unique_key,
            last_error: data.last_error,
            worker_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct ReleaseJob {
        booking_id: String,
    }

    impl Job for ReleaseJob {
        const NAME: &'static str = "release";
        const QUEUE: &'static str = "bookings";
        const MAX_RETRIES: u32 = 5;

        fn unique_key(&self) -> Option<String> {
            Some(format!("release:{}", self.booking_id))
        }
    }

    #[test]
    fn test_job_ids_are_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn test_job_data_carries_job_settings() {
        let job = ReleaseJob {
            booking_id: "b-1".into(),
        };
        let data = JobData::new(&job).unwrap();

        assert_eq!(data.name, "release");
        assert_eq!(data.queue, "bookings");
        assert_eq!(data.max_attempts, 6);
        assert_eq!(data.unique_key.as_deref(), Some("release:b-1"));
        assert_eq!(data.payload::<ReleaseJob>().unwrap(), job);
    }

    #[test]
    fn test_record_survives_json() {
        let data = JobData::new(&ReleaseJob {
            booking_id: "b-2".into(),
        })
        .unwrap();
        let restored = JobData::from_json(&data.to_json().unwrap()).unwrap();
        assert_eq!(restored.id, data.id);
        assert_eq!(restored.status, JobStatus::Pending);
    }

    #[test]
    fn test_context_tracks_attempts() {
        let mut data = JobData::new(&ReleaseJob {
            booking_id: "b-3".into(),
        })
        .unwrap();
        data.attempt = 6;
        let ctx = data.to_context("pool-1");

        assert!(ctx.is_last_attempt());
        assert_eq!(ctx.remaining_attempts(), 0);
        assert!(data.is_exhausted());
    }

    #[test]
    fn test_payload_type_mismatch_is_serialization_error() {
        let mut data = JobData::new(&ReleaseJob {
            booking_id: "b-4".into(),
        })
        .unwrap();
        data.payload = serde_json::json!({ "unexpected": true });
        let err = data.payload::<ReleaseJob>().unwrap_err();
        assert!(err.should_dlq());
    }
}
