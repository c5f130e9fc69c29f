//! Job queue abstraction.

use crate::error::{JobError, JobResult};
use crate::job::{Job, JobData, JobId, JobInfo};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Job priority levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(i8)]
pub enum Priority {
    Low = -10,
    #[default]
    Normal = 0,
    High = 10,
    Critical = 20,
}

impl From<i8> for Priority {
    fn from(value: i8) -> Self {
        match value {
            v if v >= 20 => Self::Critical,
            v if v >= 10 => Self::High,
            v if v <= -10 => Self::Low,
            _ => Self::Normal,
        }
    }
}

impl From<Priority> for i8 {
    fn from(priority: Priority) -> Self {
        priority as Self
    }
}

/// Builder for enqueuing a job with options.
pub struct QueuedJob<J: Job> {
    job: J,
    priority: Priority,
    run_at: Option<DateTime<Utc>>,
    correlation_id: Option<String>,
    retry_policy: Option<RetryPolicy>,
}

impl<J: Job> QueuedJob<J> {
    pub fn new(job: J) -> Self {
        Self {
            job,
            priority: Priority::Normal,
            run_at: None,
            correlation_id: None,
            retry_policy: None,
        }
    }

    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Runs no earlier than `delay` from now.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        let delta = TimeDelta::from_std(delay).unwrap_or(TimeDelta::MAX);
        self.run_at = Some(Utc::now().checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC));
        self
    }

    /// Runs no earlier than `at`.
    #[must_use]
    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.run_at = Some(at);
        self
    }

    #[must_use]
    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Builds the job record.
    pub fn build(self) -> JobResult<JobData> {
        let mut data = JobData::new(&self.job)?;
        data.priority = self.priority.into();
        data.correlation_id = self.correlation_id;

        if let Some(policy) = self.retry_policy {
            data.max_attempts = policy.max_retries + 1;
            data.retry_policy = policy;
        }
        if let Some(at) = self.run_at {
            data.scheduled_at = at;
        }

        Ok(data)
    }
}

/// Durable job queue backend.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Stores a job record and queues it, delayed if `scheduled_at` is in the future.
    ///
    /// Fails with [`JobError::Duplicate`] while another pending job holds
    /// the same unique key.
    async fn enqueue_data(&self, data: JobData) -> JobResult<JobId>;

    /// Claims the next ready job from `queues`, tried in order.
    async fn dequeue(&self, queues: &[String], worker_id: &str) -> JobResult<Option<JobData>>;

    /// Marks a job completed.
    async fn complete(&self, job_id: &JobId) -> JobResult<()>;

    /// Records a failed run; the job is retried or dead-lettered.
    async fn fail(&self, job_id: &JobId, error: &JobError) -> JobResult<()>;

    /// Re-schedules a job after its retry delay.
    async fn retry(&self, data: &JobData) -> JobResult<()>;

    /// Moves a job to the dead letter queue.
    async fn dead_letter(&self, data: &JobData, error: &JobError) -> JobResult<()>;

    async fn get_job(&self, job_id: &JobId) -> JobResult<Option<JobInfo>>;

    /// Number of ready jobs in a queue.
    async fn queue_length(&self, queue: &str) -> JobResult<u64>;

    /// Ready jobs in a queue, next first.
    async fn list_jobs(&self, queue: &str, limit: usize, offset: usize) -> JobResult<Vec<JobInfo>>;

    /// Dead-lettered jobs, most recent first.
    async fn list_dlq(&self, limit: usize, offset: usize) -> JobResult<Vec<JobInfo>>;

    /// Re-queues a dead-lettered job with its attempts reset.
    async fn retry_dlq(&self, job_id: &JobId) -> JobResult<()>;

    /// Cancels a pending or scheduled job.
    async fn cancel(&self, job_id: &JobId) -> JobResult<()>;

    /// Drops completed records older than `older_than`.
    async fn purge_completed(&self, older_than: Duration) -> JobResult<u64>;

    /// Announces that `worker_id` is alive for `ttl`.
    async fn heartbeat(&self, worker_id: &str, ttl: Duration) -> JobResult<()>;

    /// Re-queues jobs held by workers whose heartbeat expired.
    async fn recover_stale_jobs(&self) -> JobResult<u64>;

    async fn health_check(&self) -> JobResult<()>;
}

/// Typed enqueue helpers for any [`JobQueue`].
#[async_trait]
pub trait JobQueueExt: JobQueue {
    /// Enqueues a job for immediate execution.
    async fn enqueue<J: Job>(&self, job: J) -> JobResult<JobId> {
        self.enqueue_data(QueuedJob::new(job).build()?).await
    }

    /// Enqueues a job with options.
    async fn enqueue_with<J: Job>(&self, queued: QueuedJob<J>) -> JobResult<JobId> {
        self.enqueue_data(queued.build()?).await
    }

    /// Enqueues a job to run after `delay`.
    async fn enqueue_delayed<J: Job>(&self, job: J, delay: Duration) -> JobResult<JobId> {
        self.enqueue_data(QueuedJob::new(job).delay(delay).build()?)
            .await
    }

    /// Enqueues a job to run at `at`.
    async fn enqueue_at<J: Job>(&self, job: J, at: DateTime<Utc>) -> JobResult<JobId> {
        self.enqueue_data(QueuedJob::new(job).at(at).build()?).await
    }
}

impl<Q: JobQueue + ?Sized> JobQueueExt for Q {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct PingJob;

    impl Job for PingJob {
        const NAME: &'static str = "ping";
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
        assert_eq!(Priority::from(15), Priority::High);
        assert_eq!(Priority::from(-15), Priority::Low);
    }

    #[test]
    fn test_builder_applies_options() {
        let data = QueuedJob::new(PingJob)
            .priority(Priority::High)
            .with_retry(RetryPolicy::none())
            .correlation_id("req-1")
            .build()
            .unwrap();

        assert_eq!(data.priority, 10);
        assert_eq!(data.max_attempts, 1);
        assert_eq!(data.correlation_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn test_delay_pushes_schedule_forward() {
        let before = Utc::now();
        let data = QueuedJob::new(PingJob)
            .delay(Duration::from_secs(600))
            .build()
            .unwrap();

        assert!(data.scheduled_at >= before + TimeDelta::seconds(600));
    }

    #[tokio::test]
    async fn test_ext_enqueue_delayed_goes_through_enqueue_data() {
        let mut queue = MockJobQueue::new();
        queue
            .expect_enqueue_data()
            .withf(|data| data.name == "ping" && data.scheduled_at > Utc::now())
            .times(1)
            .returning(|data| Ok(data.id));

        queue
            .enqueue_delayed(PingJob, Duration::from_secs(30))
            .await
            .unwrap();
    }
}
