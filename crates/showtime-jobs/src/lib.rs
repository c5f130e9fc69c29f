//! # Showtime Jobs
//!
//! Durable job engine backing the booking workflows:
//! - Typed job payloads serialized with serde
//! - Redis queue with delayed execution, priorities and unique keys
//! - Worker pool with bounded concurrency and per-job timeouts
//! - Retry policies with backoff and a dead letter queue
//! - Cron scheduler with leader election across instances
//!
//! ```text
//!  producer ──enqueue──▶ delayed (zset, wake ms) ──due──▶ pqueue:{queue} (zset)
//!                                                               │ ZPOPMIN
//!                                                               ▼
//!                          dlq (zset) ◀──exhausted── worker pool ──ok──▶ completed (zset)
//!                                                       │ retryable
//!                                                       └──backoff──▶ delayed
//! ```
//!
//! Sorted sets hold job ids only; the `job:{id}` record is authoritative.

pub mod error;
pub mod job;
pub mod metrics;
pub mod queue;
pub mod redis;
pub mod retry;
pub mod scheduler;
pub mod worker;

pub use error::{JobError, JobResult};
pub use job::{Job, JobContext, JobData, JobId, JobInfo, JobStatus};
pub use metrics::{register_metrics, JobMetrics, SchedulerMetrics, WorkerMetrics};
#[cfg(any(test, feature = "testing"))]
pub use queue::MockJobQueue;
pub use queue::{JobQueue, JobQueueExt, Priority, QueuedJob};
pub use redis::{build_pool, create_pool, RedisJobQueue, RedisKeys};
pub use retry::{RetryPolicy, RetryStrategy};
pub use scheduler::{cron_expressions, ScheduledJob, ScheduledJobInfo, Scheduler, SchedulerStats};
pub use worker::{WorkerPool, WorkerPoolConfig, WorkerPoolStats};

/// Re-export commonly used traits
pub mod prelude {
    pub use crate::job::{Job, JobStatus};
    pub use crate::queue::{JobQueue, JobQueueExt, Priority};
    pub use crate::retry::RetryPolicy;
    pub use crate::{JobContext, JobError, JobId, JobResult};
}
