//! Redis job queue implementation.

use super::RedisKeys;
use crate::error::{JobError, JobResult};
use crate::job::{JobData, JobId, JobInfo, JobStatus};
use crate::metrics::JobMetrics;
use crate::queue::{JobQueue, Priority};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use deadpool_redis::{Connection, Pool};
use redis::AsyncCommands;
use showtime_config::JobsConfig;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Redis-backed job queue.
#[derive(Clone)]
pub struct RedisJobQueue {
    pool: Pool,
    keys: RedisKeys,
    config: JobsConfig,
}

impl RedisJobQueue {
    pub fn new(pool: Pool, key_prefix: &str, config: JobsConfig) -> Self {
        Self {
            pool,
            keys: RedisKeys::new(key_prefix),
            config,
        }
    }

    /// Key layout used by this queue.
    #[must_use]
    pub const fn keys(&self) -> &RedisKeys {
        &self.keys
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn conn(&self) -> JobResult<Connection> {
        Ok(self.pool.get().await?)
    }

    /// Higher priority sorts first, then earlier scheduled time.
    #[allow(clippy::cast_precision_loss)]
    fn priority_score(priority: i8, scheduled_at: DateTime<Utc>) -> f64 {
        -f64::from(priority) * 1_000_000_000_000.0 + scheduled_at.timestamp_millis() as f64
    }

    #[allow(clippy::cast_precision_loss)]
    fn millis(at: DateTime<Utc>) -> f64 {
        at.timestamp_millis() as f64
    }

    async fn load(&self, conn: &mut Connection, job_id: &str) -> JobResult<Option<JobData>> {
        let json: Option<String> = conn.get(self.keys.job(job_id)).await?;
        json.map(|j| JobData::from_json(&j)).transpose()
    }

    async fn store(&self, conn: &mut Connection, data: &JobData) -> JobResult<()> {
        let _: () = conn.set(self.keys.job(data.id.as_str()), data.to_json()?).await?;
        Ok(())
    }

    async fn release_unique(&self, conn: &mut Connection, data: &JobData) -> JobResult<()> {
        if let Some(key) = &data.unique_key {
            let _: () = conn.del(self.keys.unique(key)).await?;
        }
        Ok(())
    }

    /// Moves due delayed jobs to their ready queues.
    pub async fn process_delayed(&self) -> JobResult<u64> {
        let mut conn = self.conn().await?;
        let now = Utc::now().timestamp_millis();

        let due: Vec<String> = conn.zrangebyscore(self.keys.delayed(), 0i64, now).await?;
        let mut moved = 0u64;

        for job_id in due {
            // ZREM decides which instance owns the move.
            let removed: i64 = conn.zrem(self.keys.delayed(), &job_id).await?;
            if removed == 0 {
                continue;
            }

            let Some(mut data) = self.load(&mut conn, &job_id).await? else {
                warn!(job_id = %job_id, "Delayed job has no record, dropping");
                continue;
            };

            data.status = JobStatus::Pending;
            self.store(&mut conn, &data).await?;

            let score = Self::priority_score(data.priority, data.scheduled_at);
            let _: () = conn
                .zadd(self.keys.priority_queue(&data.queue), &job_id, score)
                .await?;

            moved += 1;
            debug!(job_id = %job_id, queue = %data.queue, "Moved delayed job to queue");
        }

        if moved > 0 {
            debug!(count = moved, "Processed delayed jobs");
        }
        Ok(moved)
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue_data(&self, mut data: JobData) -> JobResult<JobId> {
        let mut conn = self.conn().await?;
        let job_id = data.id.clone();

        if let Some(unique_key) = &data.unique_key {
            let claimed: Option<String> = redis::cmd("SET")
                .arg(self.keys.unique(unique_key))
                .arg(job_id.as_str())
                .arg("NX")
                .arg("EX")
                .arg(self.config.queue.unique_ttl_secs)
                .query_async(&mut *conn)
                .await?;

            if claimed.is_none() {
                return Err(JobError::Duplicate(unique_key.clone()));
            }
        }

        let delayed = data.scheduled_at > Utc::now();
        data.status = if delayed {
            JobStatus::Scheduled
        } else {
            JobStatus::Pending
        };
        self.store(&mut conn, &data).await?;

        if delayed {
            let _: () = conn
                .zadd(self.keys.delayed(), job_id.as_str(), Self::millis(data.scheduled_at))
                .await?;
            debug!(
                job_id = %job_id,
                job_name = %data.name,
                run_at = %data.scheduled_at,
                "Enqueued delayed job"
            );
        } else {
            let score = Self::priority_score(data.priority, data.scheduled_at);
            let _: () = conn
                .zadd(self.keys.priority_queue(&data.queue), job_id.as_str(), score)
                .await?;
            debug!(
                job_id = %job_id,
                job_name = %data.name,
                priority = ?Priority::from(data.priority),
                "Enqueued job"
            );
        }

        JobMetrics::job_enqueued(&data.queue, &data.name, delayed);
        Ok(job_id)
    }

    async fn dequeue(&self, queues: &[String], worker_id: &str) -> JobResult<Option<JobData>> {
        if let Err(e) = self.process_delayed().await {
            warn!(error = %e, "Failed to promote delayed jobs");
        }

        let mut conn = self.conn().await?;

        for queue_name in queues {
            let queue_key = self.keys.priority_queue(queue_name);

            loop {
                let popped: Vec<(String, f64)> = conn.zpopmin(&queue_key, 1).await?;
                let Some((job_id, _)) = popped.into_iter().next() else {
                    break;
                };

                let Some(mut data) = self.load(&mut conn, &job_id).await? else {
                    warn!(job_id = %job_id, queue = %queue_name, "Queued job has no record, skipping");
                    continue;
                };

                data.increment_attempt();
                data.status = JobStatus::Running;
                self.store(&mut conn, &data).await?;
                let _: () = conn.hset(self.keys.active(), &job_id, worker_id).await?;

                JobMetrics::job_dequeued(&data.queue, &data.name);
                debug!(
                    job_id = %job_id,
                    queue = %data.queue,
                    attempt = data.attempt,
                    worker_id = %worker_id,
                    "Dequeued job"
                );
                return Ok(Some(data));
            }
        }

        Ok(None)
    }

    async fn complete(&self, job_id: &JobId) -> JobResult<()> {
        let mut conn = self.conn().await?;
        let _: () = conn.hdel(self.keys.active(), job_id.as_str()).await?;

        if let Some(mut data) = self.load(&mut conn, job_id.as_str()).await? {
            data.status = JobStatus::Completed;
            data.last_error = None;

            let _: () = conn
                .set_ex(
                    self.keys.job(job_id.as_str()),
                    data.to_json()?,
                    self.config.queue.retention_secs,
                )
                .await?;
            let _: () = conn
                .zadd(self.keys.completed(), job_id.as_str(), Self::millis(Utc::now()))
                .await?;
            self.release_unique(&mut conn, &data).await?;
        }

        debug!(job_id = %job_id, "Completed job");
        Ok(())
    }

    async fn fail(&self, job_id: &JobId, error: &JobError) -> JobResult<()> {
        let mut conn = self.conn().await?;

        let Some(mut data) = self.load(&mut conn, job_id.as_str()).await? else {
            let _: () = conn.hdel(self.keys.active(), job_id.as_str()).await?;
            return Err(JobError::NotFound(job_id.to_string()));
        };
        data.set_error(error);

        let retry = error.is_retryable()
            && !data.is_exhausted()
            && data.retry_policy.should_retry(data.attempt);

        if retry {
            self.retry(&data).await?;
        } else {
            self.dead_letter(&data, error).await?;
        }

        let _: () = conn.hdel(self.keys.active(), job_id.as_str()).await?;
        Ok(())
    }

    async fn retry(&self, data: &JobData) -> JobResult<()> {
        let mut conn = self.conn().await?;

        let delay = data.retry_policy.delay_for_attempt(data.attempt);
        let run_at = Utc::now() + TimeDelta::from_std(delay).unwrap_or(TimeDelta::zero());

        let mut updated = data.clone();
        updated.scheduled_at = run_at;
        updated.status = JobStatus::Scheduled;
        self.store(&mut conn, &updated).await?;

        let _: () = conn
            .zadd(self.keys.delayed(), data.id.as_str(), Self::millis(run_at))
            .await?;

        JobMetrics::job_retried(&data.queue, &data.name, data.attempt);
        debug!(
            job_id = %data.id,
            attempt = data.attempt,
            retry_at = %run_at,
            "Scheduled job retry"
        );
        Ok(())
    }

    async fn dead_letter(&self, data: &JobData, error: &JobError) -> JobResult<()> {
        let mut conn = self.conn().await?;
        self.release_unique(&mut conn, data).await?;
        JobMetrics::job_dead_lettered(&data.queue, &data.name, error.kind());

        if !self.config.queue.dlq.enabled {
            let _: () = conn.del(self.keys.job(data.id.as_str())).await?;
            warn!(job_id = %data.id, error = %error, "Dropped failed job, DLQ disabled");
            return Ok(());
        }

        let mut dead = data.clone();
        dead.set_error(error);
        dead.status = JobStatus::DeadLetter;

        let _: () = conn
            .set_ex(
                self.keys.job(data.id.as_str()),
                dead.to_json()?,
                self.config.queue.dlq.retention_secs,
            )
            .await?;
        let _: () = conn
            .zadd(self.keys.dlq(), data.id.as_str(), Self::millis(Utc::now()))
            .await?;

        warn!(
            job_id = %data.id,
            job_name = %data.name,
            error = %error,
            attempts = data.attempt,
            "Moved job to dead letter queue"
        );
        Ok(())
    }

    async fn get_job(&self, job_id: &JobId) -> JobResult<Option<JobInfo>> {
        let mut conn = self.conn().await?;

        let Some(data) = self.load(&mut conn, job_id.as_str()).await? else {
            return Ok(None);
        };
        let mut info = JobInfo::from(data);
        let worker: Option<String> = conn.hget(self.keys.active(), job_id.as_str()).await?;
        if worker.is_some() {
            info.status = JobStatus::Running;
            info.worker_id = worker;
        }
        Ok(Some(info))
    }

    async fn queue_length(&self, queue: &str) -> JobResult<u64> {
        let mut conn = self.conn().await?;
        Ok(conn.zcard(self.keys.priority_queue(queue)).await?)
    }

    async fn list_jobs(&self, queue: &str, limit: usize, offset: usize) -> JobResult<Vec<JobInfo>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        let ids: Vec<String> = conn
            .zrange(self.keys.priority_queue(queue), as_index(offset), as_index(offset + limit - 1))
            .await?;

        let mut infos = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(data) = self.load(&mut conn, &id).await? {
                infos.push(JobInfo::from(data));
            }
        }
        Ok(infos)
    }

    async fn list_dlq(&self, limit: usize, offset: usize) -> JobResult<Vec<JobInfo>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        let ids: Vec<String> = conn
            .zrevrange(self.keys.dlq(), as_index(offset), as_index(offset + limit - 1))
            .await?;

        let mut infos = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(data) = self.load(&mut conn, &id).await? {
                infos.push(JobInfo::from(data));
            }
        }
        Ok(infos)
    }

    async fn retry_dlq(&self, job_id: &JobId) -> JobResult<()> {
        let mut conn = self.conn().await?;

        let removed: i64 = conn.zrem(self.keys.dlq(), job_id.as_str()).await?;
        if removed == 0 {
            return Err(JobError::NotFound(job_id.to_string()));
        }
        let Some(mut data) = self.load(&mut conn, job_id.as_str()).await? else {
            return Err(JobError::NotFound(job_id.to_string()));
        };

        data.attempt = 0;
        data.last_error = None;
        data.scheduled_at = Utc::now();
        data.status = JobStatus::Pending;
        let _: () = conn.persist(self.keys.job(job_id.as_str())).await?;
        self.store(&mut conn, &data).await?;

        let score = Self::priority_score(data.priority, data.scheduled_at);
        let _: () = conn
            .zadd(self.keys.priority_queue(&data.queue), job_id.as_str(), score)
            .await?;

        info!(job_id = %job_id, job_name = %data.name, "Retried job from DLQ");
        Ok(())
    }

    async fn cancel(&self, job_id: &JobId) -> JobResult<()> {
        let mut conn = self.conn().await?;

        let Some(data) = self.load(&mut conn, job_id.as_str()).await? else {
            return Err(JobError::NotFound(job_id.to_string()));
        };
        if !matches!(data.status, JobStatus::Pending | JobStatus::Scheduled) {
            return Err(JobError::InvalidState {
                expected: "pending or scheduled".to_string(),
                actual: data.status.to_string(),
            });
        }

        let _: () = redis::pipe()
            .del(self.keys.job(job_id.as_str()))
            .zrem(self.keys.priority_queue(&data.queue), job_id.as_str())
            .zrem(self.keys.delayed(), job_id.as_str())
            .query_async(&mut *conn)
            .await?;
        self.release_unique(&mut conn, &data).await?;

        JobMetrics::job_cancelled(&data.queue, &data.name);
        info!(job_id = %job_id, job_name = %data.name, "Cancelled job");
        Ok(())
    }

    async fn purge_completed(&self, older_than: Duration) -> JobResult<u64> {
        let mut conn = self.conn().await?;
        let threshold =
            Utc::now() - TimeDelta::from_std(older_than).unwrap_or(TimeDelta::zero());

        let ids: Vec<String> = conn
            .zrangebyscore(self.keys.completed(), 0i64, threshold.timestamp_millis())
            .await?;
        if ids.is_empty() {
            return Ok(0);
        }

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.del(self.keys.job(id)).zrem(self.keys.completed(), id);
        }
        let _: () = pipe.query_async(&mut *conn).await?;

        info!(count = ids.len(), "Purged completed jobs");
        Ok(ids.len() as u64)
    }

    async fn heartbeat(&self, worker_id: &str, ttl: Duration) -> JobResult<()> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .set_ex(self.keys.worker(worker_id), Utc::now().to_rfc3339(), ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    async fn recover_stale_jobs(&self) -> JobResult<u64> {
        let mut conn = self.conn().await?;
        let active: HashMap<String, String> = conn.hgetall(self.keys.active()).await?;

        let mut recovered = 0u64;
        for (job_id, worker_id) in active {
            let alive: bool = conn.exists(self.keys.worker(&worker_id)).await?;
            if alive {
                continue;
            }

            // HDEL decides which instance recovers the job.
            let removed: i64 = conn.hdel(self.keys.active(), &job_id).await?;
            if removed == 0 {
                continue;
            }

            let Some(mut data) = self.load(&mut conn, &job_id).await? else {
                continue;
            };
            let error = JobError::Worker(format!("Worker {worker_id} stopped heartbeating"));
            data.set_error(&error);

            if data.is_exhausted() {
                self.dead_letter(&data, &error).await?;
            } else {
                self.retry(&data).await?;
            }

            recovered += 1;
            warn!(job_id = %job_id, worker_id = %worker_id, "Recovered job from dead worker");
        }

        if recovered > 0 {
            info!(count = recovered, "Recovered stale jobs");
        }
        Ok(recovered)
    }

    async fn health_check(&self) -> JobResult<()> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING").query_async(&mut *conn).await?;
        Ok(())
    }
}

fn as_index(value: usize) -> isize {
    isize::try_from(value).unwrap_or(isize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_priority_beats_time() {
        let early = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let late = early + TimeDelta::hours(5);

        let high_late = RedisJobQueue::priority_score(10, late);
        let normal_early = RedisJobQueue::priority_score(0, early);
        assert!(high_late < normal_early);
    }

    #[test]
    fn test_same_priority_is_fifo() {
        let early = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let late = early + TimeDelta::seconds(1);
        assert!(
            RedisJobQueue::priority_score(0, early) < RedisJobQueue::priority_score(0, late)
        );
    }
}
