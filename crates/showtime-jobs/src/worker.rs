//! Worker pool for processing jobs.

use crate::error::{JobError, JobResult};
use crate::job::{Job, JobContext, JobData};
use crate::metrics::{JobMetrics, WorkerMetrics};
use crate::queue::JobQueue;
use chrono::Utc;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use showtime_config::WorkerConfig;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Semaphore};
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub concurrency: usize,
    /// Queues to poll, highest priority first.
    pub queues: Vec<String>,
    /// Timeout for jobs that do not set their own.
    pub job_timeout: Duration,
    pub poll_interval: Duration,
    pub shutdown_timeout: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

impl From<&WorkerConfig> for WorkerPoolConfig {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            queues: config.queues.clone(),
            job_timeout: config.job_timeout(),
            poll_interval: config.poll_interval(),
            shutdown_timeout: config.shutdown_timeout(),
            heartbeat_interval: config.heartbeat_interval(),
        }
    }
}

/// Type-erased job handler.
pub type JobHandler =
    Arc<dyn Fn(JobData, JobContext) -> BoxFuture<'static, Result<(), JobError>> + Send + Sync>;

type HandlerMap = Arc<RwLock<HashMap<String, JobHandler>>>;

/// Worker pool for concurrent job processing.
pub struct WorkerPool {
    id: String,
    queue: Arc<dyn JobQueue>,
    config: WorkerPoolConfig,
    handlers: HandlerMap,
    shutdown_tx: broadcast::Sender<()>,
    running: Arc<AtomicBool>,
    jobs_processed: Arc<AtomicU64>,
    jobs_failed: Arc<AtomicU64>,
}

impl WorkerPool {
    pub fn new(queue: Arc<dyn JobQueue>, config: WorkerPoolConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            id: format!("worker-pool-{}", Uuid::new_v4()),
            queue,
            config,
            handlers: Arc::new(RwLock::new(HashMap::new())),
            shutdown_tx,
            running: Arc::new(AtomicBool::new(false)),
            jobs_processed: Arc::new(AtomicU64::new(0)),
            jobs_failed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Registers the handler for job type `J`.
    ///
    /// Payloads that fail to decode as `J` fail with a serialization error
    /// and are dead-lettered without retries.
    pub fn register<J, F, Fut>(&self, handler: F)
    where
        J: Job,
        F: Fn(J, JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let erased: JobHandler = Arc::new(move |data: JobData, ctx: JobContext| {
            match data.payload::<J>() {
                Ok(job) => handler(job, ctx).boxed(),
                Err(e) => futures::future::ready(Err(e)).boxed(),
            }
        });

        self.handlers.write().insert(J::NAME.to_string(), erased);
        info!(job_type = J::NAME, queue = J::QUEUE, "Registered job handler");
    }

    /// Names of the registered job types.
    #[must_use]
    pub fn registered(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Runs the pool until [`stop`](Self::stop) is called.
    pub async fn start(&self) -> JobResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(JobError::Worker("Worker pool already running".to_string()));
        }

        info!(
            pool_id = %self.id,
            concurrency = self.config.concurrency,
            queues = ?self.config.queues,
            "Starting worker pool"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let heartbeat = self.spawn_heartbeat();

        loop {
            let permit = tokio::select! {
                _ = shutdown_rx.recv() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            // Not raced against shutdown: a popped job must reach a worker.
            match self.queue.dequeue(&self.config.queues, &self.id).await {
                Ok(Some(job_data)) => {
                    let queue = Arc::clone(&self.queue);
                    let handlers = Arc::clone(&self.handlers);
                    let worker_id = self.id.clone();
                    let default_timeout = self.config.job_timeout;
                    let processed = Arc::clone(&self.jobs_processed);
                    let failed = Arc::clone(&self.jobs_failed);
                    let span = info_span!("job", job_id = %job_data.id, job_name = %job_data.name);

                    WorkerMetrics::update_workers(
                        &self.id,
                        self.config.concurrency - semaphore.available_permits(),
                        self.config.concurrency,
                    );

                    tokio::spawn(
                        async move {
                            let ok = process_job(
                                queue.as_ref(),
                                &handlers,
                                job_data,
                                &worker_id,
                                default_timeout,
                            )
                            .await;
                            if ok {
                                processed.fetch_add(1, Ordering::Relaxed);
                            } else {
                                failed.fetch_add(1, Ordering::Relaxed);
                            }
                            drop(permit);
                        }
                        .instrument(span),
                    );
                    continue;
                }
                Ok(None) => drop(permit),
                Err(e) => {
                    drop(permit);
                    error!(error = %e, "Failed to dequeue job");
                }
            }

            tokio::select! {
                _ = shutdown_rx.recv() => break,
                () = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!(pool_id = %self.id, "Waiting for workers to finish...");
        let drained = timeout(self.config.shutdown_timeout, async {
            while semaphore.available_permits() < self.config.concurrency {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
        .await;
        if drained.is_err() {
            warn!(pool_id = %self.id, "Shutdown timeout reached with jobs still running");
        }

        heartbeat.abort();
        self.running.store(false, Ordering::SeqCst);

        info!(
            pool_id = %self.id,
            processed = self.jobs_processed(),
            failed = self.jobs_failed(),
            "Worker pool stopped"
        );
        Ok(())
    }

    fn spawn_heartbeat(&self) -> tokio::task::JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let id = self.id.clone();
        let every = self.config.heartbeat_interval.max(Duration::from_secs(1));
        let ttl = every * 3;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                if let Err(e) = queue.heartbeat(&id, ttl).await {
                    warn!(pool_id = %id, error = %e, "Failed to send heartbeat");
                    continue;
                }
                if let Err(e) = queue.recover_stale_jobs().await {
                    warn!(pool_id = %id, error = %e, "Failed to recover stale jobs");
                }
            }
        })
    }

    /// Asks the pool to stop; [`start`](Self::start) returns once running jobs drain.
    pub fn stop(&self) {
        info!(pool_id = %self.id, "Stopping worker pool...");
        let _ = self.shutdown_tx.send(());
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn jobs_processed(&self) -> u64 {
        self.jobs_processed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn jobs_failed(&self) -> u64 {
        self.jobs_failed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn stats(&self) -> WorkerPoolStats {
        WorkerPoolStats {
            id: self.id.clone(),
            running: self.is_running(),
            concurrency: self.config.concurrency,
            jobs_processed: self.jobs_processed(),
            jobs_failed: self.jobs_failed(),
            queues: self.config.queues.clone(),
        }
    }
}

/// Runs one claimed job and reports the outcome to the queue.
///
/// Returns true if the handler succeeded.
async fn process_job(
    queue: &dyn JobQueue,
    handlers: &HandlerMap,
    job_data: JobData,
    worker_id: &str,
    default_timeout: Duration,
) -> bool {
    let job_id = job_data.id.clone();
    let job_name = job_data.name.clone();
    let queue_name = job_data.queue.clone();
    let run_timeout = job_data.timeout_or(default_timeout);

    if let Ok(wait) = (Utc::now() - job_data.scheduled_at).to_std() {
        JobMetrics::job_wait_time(&job_name, wait);
    }

    // Cloned out so the lock is not held across the await.
    let handler = handlers.read().get(&job_name).cloned();
    let Some(handler) = handler else {
        error!(job_id = %job_id, job_name = %job_name, "No handler registered for job type");
        let err = JobError::Configuration(format!("No handler for job type: {job_name}"));
        if let Err(e) = queue.fail(&job_id, &err).await {
            error!(job_id = %job_id, error = %e, "Failed to mark job as failed");
        }
        return false;
    };

    let ctx = job_data.to_context(worker_id);
    debug!(job_id = %job_id, attempt = ctx.attempt, "Processing job");
    let started = Instant::now();

    let outcome = match timeout(run_timeout, handler(job_data, ctx)).await {
        Ok(result) => result,
        Err(_) => {
            JobMetrics::job_timed_out(&queue_name, &job_name);
            Err(JobError::Timeout(run_timeout.as_secs()))
        }
    };

    match outcome {
        Ok(()) => {
            JobMetrics::job_completed(&queue_name, &job_name, started.elapsed());
            debug!(job_id = %job_id, "Job completed successfully");
            if let Err(e) = queue.complete(&job_id).await {
                error!(job_id = %job_id, error = %e, "Failed to mark job as complete");
            }
            true
        }
        Err(err) => {
            JobMetrics::job_failed(&queue_name, &job_name, err.kind(), started.elapsed());
            warn!(job_id = %job_id, error = %err, "Job execution failed");
            if let Err(e) = queue.fail(&job_id, &err).await {
                error!(job_id = %job_id, error = %e, "Failed to mark job as failed");
            }
            false
        }
    }
}

/// Worker pool statistics.
#[derive(Debug, Clone)]
pub struct WorkerPoolStats {
    pub id: String,
    pub running: bool,
    pub concurrency: usize,
    pub jobs_processed: u64,
    pub jobs_failed: u64,
    pub queues: Vec<String>,
}
