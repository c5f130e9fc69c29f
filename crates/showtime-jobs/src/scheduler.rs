//! Cron scheduler for recurring jobs with distributed leader election.
//!
//! Only the instance holding the leader lock enqueues due jobs, so a cron
//! entry fires once per tick across every running process.

use crate::error::{JobError, JobResult};
use crate::job::{Job, JobData, JobId};
use crate::metrics::SchedulerMetrics;
use crate::queue::JobQueue;
use crate::redis::RedisKeys;
use chrono::{DateTime, Utc};
use cron::Schedule;
use deadpool_redis::Pool;
use parking_lot::{Mutex, RwLock};
use redis::AsyncCommands;
use serde::Serialize;
use showtime_config::SchedulerConfig;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

type JobFactory = Arc<dyn Fn() -> JobResult<JobData> + Send + Sync>;

/// Scheduled job definition.
#[derive(Clone)]
pub struct ScheduledJob {
    pub name: String,
    pub cron: String,
    schedule: Schedule,
    factory: JobFactory,
    pub enabled: bool,
}

impl std::fmt::Debug for ScheduledJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledJob")
            .field("name", &self.name)
            .field("cron", &self.cron)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl ScheduledJob {
    /// Creates a scheduled job from a six-field cron expression.
    pub fn new<J: Job>(
        name: impl Into<String>,
        cron_expr: &str,
        job_factory: impl Fn() -> J + Send + Sync + 'static,
    ) -> JobResult<Self> {
        let schedule = Schedule::from_str(cron_expr)
            .map_err(|e| JobError::Configuration(format!("Invalid cron expression: {e}")))?;

        let factory: JobFactory = Arc::new(move || JobData::new(&job_factory()));

        Ok(Self {
            name: name.into(),
            cron: cron_expr.to_string(),
            schedule,
            factory,
            enabled: true,
        })
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// First fire time strictly after `from`.
    #[must_use]
    pub fn next_run_from(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&from).next()
    }

    /// Whether a run is owed given the previous fire time.
    #[must_use]
    pub fn is_due(&self, last_run: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.next_run_from(last_run).is_some_and(|next| next <= now)
    }

    pub fn create_job_data(&self) -> JobResult<JobData> {
        (self.factory)()
    }
}

/// Scheduler statistics.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStats {
    pub id: String,
    pub is_leader: bool,
    pub scheduled_jobs: usize,
    pub jobs_executed: u64,
    pub last_election: Option<DateTime<Utc>>,
}

/// Distributed cron scheduler with leader election.
pub struct Scheduler {
    id: String,
    pool: Pool,
    queue: Arc<dyn JobQueue>,
    config: SchedulerConfig,
    keys: RedisKeys,
    jobs: RwLock<HashMap<String, ScheduledJob>>,
    shutdown_tx: broadcast::Sender<()>,
    running: AtomicBool,
    is_leader: AtomicBool,
    jobs_executed: AtomicU64,
    last_election: Mutex<Option<DateTime<Utc>>>,
}

impl Scheduler {
    pub fn new(
        pool: Pool,
        queue: Arc<dyn JobQueue>,
        config: SchedulerConfig,
        key_prefix: &str,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            id: format!("scheduler-{}", Uuid::new_v4()),
            pool,
            queue,
            config,
            keys: RedisKeys::new(key_prefix),
            jobs: RwLock::new(HashMap::new()),
            shutdown_tx,
            running: AtomicBool::new(false),
            is_leader: AtomicBool::new(false),
            jobs_executed: AtomicU64::new(0),
            last_election: Mutex::new(None),
        }
    }

    pub fn register(&self, job: ScheduledJob) {
        let name = job.name.clone();
        info!(job_name = %name, cron = %job.cron, "Registered scheduled job");
        self.jobs.write().insert(name, job);
    }

    /// Registers `job_factory` to run on `cron_expr`.
    pub fn schedule<J: Job>(
        &self,
        name: impl Into<String>,
        cron_expr: &str,
        job_factory: impl Fn() -> J + Send + Sync + 'static,
    ) -> JobResult<()> {
        self.register(ScheduledJob::new(name, cron_expr, job_factory)?);
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> Option<ScheduledJob> {
        self.jobs.write().remove(name)
    }

    #[must_use]
    pub fn is_leader(&self) -> bool {
        self.is_leader.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    fn set_leader(&self, leader: bool) {
        let was = self.is_leader.swap(leader, Ordering::SeqCst);
        if leader && !was {
            *self.last_election.lock() = Some(Utc::now());
        }
        SchedulerMetrics::update_leader_status(&self.id, leader);
    }

    async fn try_acquire_leadership(&self) -> JobResult<bool> {
        let mut conn = self.pool.get().await?;
        let lock_key = self.keys.scheduler_lock();
        let ttl_secs = self.config.leader_ttl_secs;

        let acquired: Option<String> = redis::cmd("SET")
            .arg(&lock_key)
            .arg(&self.id)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut *conn)
            .await?;

        if acquired.is_some() {
            if !self.is_leader() {
                info!(scheduler_id = %self.id, "Acquired scheduler leadership");
            }
            self.set_leader(true);
            return Ok(true);
        }

        let current: Option<String> = conn.get(&lock_key).await?;
        if current.as_deref() == Some(self.id.as_str()) {
            let _: bool = conn.expire(&lock_key, ttl_secs as i64).await?;
            self.set_leader(true);
            return Ok(true);
        }

        if self.is_leader() {
            warn!(scheduler_id = %self.id, "Lost scheduler leadership");
        }
        self.set_leader(false);
        Ok(false)
    }

    async fn release_leadership(&self) -> JobResult<()> {
        if !self.is_leader() {
            return Ok(());
        }

        let mut conn = self.pool.get().await?;
        let script = redis::Script::new(
            r#"
            if redis.call("get", KEYS[1]) == ARGV[1] then
                return redis.call("del", KEYS[1])
            else
                return 0
            end
            "#,
        );
        let _: i32 = script
            .key(self.keys.scheduler_lock())
            .arg(&self.id)
            .invoke_async(&mut *conn)
            .await?;

        self.set_leader(false);
        info!(scheduler_id = %self.id, "Released scheduler leadership");
        Ok(())
    }

    /// Runs until [`stop`](Self::stop) is called.
    pub async fn start(&self) -> JobResult<()> {
        if !self.config.enabled {
            info!(scheduler_id = %self.id, "Scheduler disabled");
            return Ok(());
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(JobError::Scheduler("Scheduler already running".to_string()));
        }

        info!(
            scheduler_id = %self.id,
            poll_interval_secs = self.config.poll_interval_secs,
            "Starting scheduler"
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut poll = interval(Duration::from_secs(self.config.poll_interval_secs.max(1)));
        let mut leader_check =
            interval(Duration::from_secs(self.config.leader_check_interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!(scheduler_id = %self.id, "Received shutdown signal");
                    break;
                }
                _ = leader_check.tick() => {
                    if let Err(e) = self.try_acquire_leadership().await {
                        error!(error = %e, "Failed to check leadership");
                    }
                }
                _ = poll.tick() => {
                    if self.is_leader() {
                        if let Err(e) = self.check_and_enqueue_jobs().await {
                            error!(error = %e, "Failed to check scheduled jobs");
                        }
                    }
                }
            }
        }

        if let Err(e) = self.release_leadership().await {
            warn!(error = %e, "Failed to release leadership on shutdown");
        }

        self.running.store(false, Ordering::SeqCst);
        info!(scheduler_id = %self.id, "Scheduler stopped");
        Ok(())
    }

    pub fn stop(&self) {
        info!(scheduler_id = %self.id, "Stopping scheduler...");
        let _ = self.shutdown_tx.send(());
    }

    async fn check_and_enqueue_jobs(&self) -> JobResult<()> {
        let now = Utc::now();
        let due_candidates: Vec<ScheduledJob> = self
            .jobs
            .read()
            .values()
            .filter(|job| job.enabled)
            .cloned()
            .collect();

        let mut conn = self.pool.get().await?;

        for job in due_candidates {
            let last_run_key = self.keys.last_run(&job.name);
            let last_run: Option<String> = conn.get(&last_run_key).await?;

            let due = match last_run.as_deref().map(DateTime::parse_from_rfc3339) {
                Some(Ok(last)) => job.is_due(last.with_timezone(&Utc), now),
                // First sighting only anchors the schedule.
                None | Some(Err(_)) => {
                    let _: () = conn.set(&last_run_key, now.to_rfc3339()).await?;
                    false
                }
            };
            if !due {
                continue;
            }

            let data = match job.create_job_data() {
                Ok(data) => data,
                Err(e) => {
                    error!(job_name = %job.name, error = %e, "Failed to build scheduled job");
                    continue;
                }
            };

            let _: () = conn.set(&last_run_key, now.to_rfc3339()).await?;
            match self.queue.enqueue_data(data).await {
                Ok(job_id) => {
                    debug!(job_name = %job.name, job_id = %job_id, "Enqueued scheduled job");
                    self.jobs_executed.fetch_add(1, Ordering::Relaxed);
                    SchedulerMetrics::job_triggered(&job.name);
                }
                Err(e) => {
                    error!(job_name = %job.name, error = %e, "Failed to enqueue scheduled job");
                    let _: () = conn.del(&last_run_key).await?;
                }
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            id: self.id.clone(),
            is_leader: self.is_leader(),
            scheduled_jobs: self.jobs.read().len(),
            jobs_executed: self.jobs_executed.load(Ordering::Relaxed),
            last_election: *self.last_election.lock(),
        }
    }

    /// Registered jobs sorted by name.
    #[must_use]
    pub fn list_jobs(&self) -> Vec<ScheduledJobInfo> {
        let now = Utc::now();
        let mut infos: Vec<ScheduledJobInfo> = self
            .jobs
            .read()
            .values()
            .map(|job| ScheduledJobInfo {
                name: job.name.clone(),
                cron: job.cron.clone(),
                enabled: job.enabled,
                next_run: job.next_run_from(now),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn enable_job(&self, name: &str) -> bool {
        self.set_enabled(name, true)
    }

    pub fn disable_job(&self, name: &str) -> bool {
        self.set_enabled(name, false)
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.jobs.write().get_mut(name) {
            Some(job) => {
                job.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Enqueues a scheduled job now, outside its cron schedule.
    pub async fn trigger_job(&self, name: &str) -> JobResult<JobId> {
        let data = {
            let jobs = self.jobs.read();
            let job = jobs
                .get(name)
                .ok_or_else(|| JobError::NotFound(format!("Scheduled job not found: {name}")))?;
            job.create_job_data()?
        };

        let job_id = self.queue.enqueue_data(data).await?;
        SchedulerMetrics::job_triggered(name);
        info!(job_name = %name, job_id = %job_id, "Triggered scheduled job");
        Ok(job_id)
    }
}

/// Information about a scheduled job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledJobInfo {
    pub name: String,
    pub cron: String,
    pub enabled: bool,
    pub next_run: Option<DateTime<Utc>>,
}

/// Common cron expressions (seconds first).
pub mod cron_expressions {
    pub const EVERY_MINUTE: &str = "0 * * * * *";
    pub const EVERY_5_MINUTES: &str = "0 */5 * * * *";
    pub const EVERY_HOUR: &str = "0 0 * * * *";
    pub const EVERY_8_HOURS: &str = "0 0 */8 * * *";
    pub const DAILY_MIDNIGHT: &str = "0 0 0 * * *";
}
