//! Job engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the job engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Worker pool configuration.
    pub worker: WorkerConfig,
    /// Queue configuration.
    pub queue: QueueConfig,
    /// Scheduler configuration.
    pub scheduler: SchedulerConfig,
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of jobs processed concurrently.
    pub concurrency: usize,
    /// Queues to poll, highest priority first.
    pub queues: Vec<String>,
    /// Job execution timeout in seconds, unless the job sets its own.
    pub job_timeout_secs: u64,
    /// Polling interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Shutdown timeout in seconds.
    pub shutdown_timeout_secs: u64,
    /// Heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            queues: vec![
                "bookings".to_string(),
                "users".to_string(),
                "notifications".to_string(),
                "default".to_string(),
            ],
            job_timeout_secs: 300,
            poll_interval_ms: 250,
            shutdown_timeout_secs: 30,
            heartbeat_interval_secs: 15,
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(4)
        .max(4)
}

impl WorkerConfig {
    /// Returns job timeout as Duration.
    #[must_use]
    pub const fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    /// Returns poll interval as Duration.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns shutdown timeout as Duration.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Returns heartbeat interval as Duration.
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

/// Queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Dead letter queue configuration.
    pub dlq: DlqConfig,
    /// Completed job retention in seconds.
    pub retention_secs: u64,
    /// How long a unique key outlives its pending job, in seconds.
    pub unique_ttl_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            dlq: DlqConfig::default(),
            retention_secs: 86400 * 7,
            unique_ttl_secs: 86400,
        }
    }
}

impl QueueConfig {
    /// Returns completed-job retention as Duration.
    #[must_use]
    pub const fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

/// Dead letter queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DlqConfig {
    pub enabled: bool,
    /// DLQ retention in seconds.
    pub retention_secs: u64,
}

impl Default for DlqConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_secs: 86400 * 30,
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// How often due cron entries are checked, in seconds.
    pub poll_interval_secs: u64,
    /// How often leadership is renewed, in seconds.
    pub leader_check_interval_secs: u64,
    /// Leader lock TTL in seconds.
    pub leader_ttl_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 10,
            leader_check_interval_secs: 15,
            leader_ttl_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_defaults_poll_every_queue() {
        let worker = WorkerConfig::default();
        assert!(worker.concurrency >= 4);
        assert!(worker.queues.iter().any(|q| q == "bookings"));
        assert_eq!(worker.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_scheduler_ttl_outlives_check_interval() {
        let scheduler = SchedulerConfig::default();
        assert!(scheduler.leader_ttl_secs > scheduler.leader_check_interval_secs);
    }
}
