//! Redis-backed job queue implementation.

mod queue;

pub use queue::RedisJobQueue;

use crate::error::{JobError, JobResult};
use deadpool_redis::{Config, Pool, Runtime};
use showtime_config::RedisConfig;
use tracing::info;

/// Builds a connection pool without touching the server.
pub fn build_pool(config: &RedisConfig) -> JobResult<Pool> {
    Config::from_url(&config.url)
        .builder()
        .map_err(|e| JobError::Configuration(format!("Invalid Redis config: {e}")))?
        .max_size(config.pool_size)
        .wait_timeout(Some(std::time::Duration::from_secs(config.connect_timeout_secs)))
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| JobError::Configuration(format!("Failed to create pool: {e}")))
}

/// Builds a connection pool and checks it with `PING`.
pub async fn create_pool(config: &RedisConfig) -> JobResult<Pool> {
    info!("Creating Redis connection pool for job queue...");

    let pool = build_pool(config)?;
    let mut conn = pool.get().await?;
    redis::cmd("PING").query_async::<String>(&mut *conn).await?;

    info!("Redis connection pool created successfully");
    Ok(pool)
}

/// Key layout of the job engine.
#[derive(Debug, Clone)]
pub struct RedisKeys {
    prefix: String,
}

impl RedisKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Ready jobs of a queue (zset: id -> priority score).
    #[must_use]
    pub fn priority_queue(&self, queue_name: &str) -> String {
        format!("{}:pqueue:{queue_name}", self.prefix)
    }

    /// Delayed jobs (zset: id -> wake time in millis).
    #[must_use]
    pub fn delayed(&self) -> String {
        format!("{}:delayed", self.prefix)
    }

    /// Running jobs (hash: id -> worker id).
    #[must_use]
    pub fn active(&self) -> String {
        format!("{}:active", self.prefix)
    }

    /// Job record (string: JSON).
    #[must_use]
    pub fn job(&self, job_id: &str) -> String {
        format!("{}:job:{job_id}", self.prefix)
    }

    /// Dead letter queue (zset: id -> failure time in millis).
    #[must_use]
    pub fn dlq(&self) -> String {
        format!("{}:dlq", self.prefix)
    }

    /// Completed jobs (zset: id -> completion time in millis).
    #[must_use]
    pub fn completed(&self) -> String {
        format!("{}:completed", self.prefix)
    }

    /// Unique key guard (string: job id, with TTL).
    #[must_use]
    pub fn unique(&self, key: &str) -> String {
        format!("{}:unique:{key}", self.prefix)
    }

    /// Worker heartbeat (string, with TTL).
    #[must_use]
    pub fn worker(&self, worker_id: &str) -> String {
        format!("{}:worker:{worker_id}", self.prefix)
    }

    #[must_use]
    pub fn scheduler_lock(&self) -> String {
        format!("{}:scheduler:lock", self.prefix)
    }

    /// Last fire time of a cron entry (string: RFC 3339).
    #[must_use]
    pub fn last_run(&self, name: &str) -> String {
        format!("{}:scheduler:last_run:{name}", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_keys() {
        let keys = RedisKeys::new("test");

        assert_eq!(keys.priority_queue("bookings"), "test:pqueue:bookings");
        assert_eq!(keys.job("123"), "test:job:123");
        assert_eq!(keys.dlq(), "test:dlq");
        assert_eq!(keys.worker("w1"), "test:worker:w1");
        assert_eq!(
            keys.last_run("send-show-reminders"),
            "test:scheduler:last_run:send-show-reminders"
        );
    }

    #[test]
    fn test_build_pool_rejects_bad_url() {
        let config = RedisConfig {
            url: "not a url".to_string(),
            ..RedisConfig::default()
        };
        assert!(build_pool(&config).is_err());
    }

    #[test]
    fn test_build_pool_is_lazy() {
        let config = RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            ..RedisConfig::default()
        };
        assert!(build_pool(&config).is_ok());
    }
}
