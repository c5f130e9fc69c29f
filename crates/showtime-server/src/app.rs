//! Application wiring.

use crate::startup::shutdown_signal;
use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use showtime_config::{AppConfig, JobsConfig};
use showtime_core::{ShowtimeError, ShowtimeResult};
use showtime_jobs::{
    create_pool, JobQueue, JobResult, RedisJobQueue, Scheduler, WorkerPool, WorkerPoolConfig,
};
use showtime_repository::DatabasePool;
use showtime_rest::{create_router, AppState, ClerkSessionVerifier, SessionVerifier, WebhookVerifier};
use showtime_service::workflows::{register_handlers, schedule_reminders};
use showtime_service::{
    BookingService, ClerkClient, EventBus, IdentityProvider, Mailer, QueueEventBus, Repositories,
    ShowService, SmtpMailer, UserService, Workflows,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How often due delayed jobs are promoted to their queues.
const DELAYED_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// How often expired completed jobs are purged.
const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// A fully wired server, ready to run.
pub struct Application {
    config: AppConfig,
    router: Router,
    database: DatabasePool,
    queue: Arc<RedisJobQueue>,
    worker_pool: Arc<WorkerPool>,
    scheduler: Arc<Scheduler>,
}

impl Application {
    /// Connects to MySQL and Redis and builds every component.
    pub async fn build(config: AppConfig, metrics: Option<PrometheusHandle>) -> ShowtimeResult<Self> {
        let database = DatabasePool::connect(&config.database).await?;
        if config.database.run_migrations {
            database.run_migrations().await?;
        }

        let redis = create_pool(&config.redis).await?;
        let queue = Arc::new(RedisJobQueue::new(
            redis.clone(),
            &config.redis.key_prefix,
            config.jobs.clone(),
        ));
        let job_queue: Arc<dyn JobQueue> = queue.clone();

        let repos = Repositories::mysql(&database);
        let events: Arc<dyn EventBus> = Arc::new(QueueEventBus::new(
            job_queue.clone(),
            config.workflow.payment_window(),
        ));
        let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::new(&config.email)?);
        let identity: Arc<dyn IdentityProvider> = Arc::new(ClerkClient::new(&config.identity)?);

        // Background workflows
        let workflows = Arc::new(Workflows::new(
            repos.clone(),
            mailer,
            config.workflow.clone(),
        ));
        let worker_pool = Arc::new(WorkerPool::new(
            job_queue.clone(),
            WorkerPoolConfig::from(&config.jobs.worker),
        ));
        register_handlers(&worker_pool, &workflows);

        let scheduler = Arc::new(Scheduler::new(
            redis,
            job_queue.clone(),
            config.jobs.scheduler.clone(),
            &config.redis.key_prefix,
        ));
        schedule_reminders(&scheduler, &config.workflow.reminder_cron)?;

        // HTTP surface
        let state = AppState::new(
            Arc::new(BookingService::new(
                repos.clone(),
                events.clone(),
                config.workflow.seat_write_attempts,
            )),
            Arc::new(ShowService::new(repos.clone(), events.clone())),
            Arc::new(UserService::new(repos, identity)),
            events,
            job_queue,
            scheduler.clone(),
        )
        .with_database(database.clone());

        let state = match config.identity.webhook_secret.as_deref() {
            Some(secret) => state.with_webhook_verifier(WebhookVerifier::new(secret)?),
            None => {
                warn!("No Clerk webhook secret configured; webhook deliveries will be rejected");
                state
            }
        };

        let verifier: Arc<dyn SessionVerifier> =
            Arc::new(ClerkSessionVerifier::new(&config.identity)?);
        let mut router = create_router(state, verifier, &config.server);

        if let Some(handle) = metrics {
            router = router.route(
                &config.observability.metrics_path,
                get(move || std::future::ready(handle.render())),
            );
        }

        Ok(Self {
            config,
            router,
            database,
            queue,
            worker_pool,
            scheduler,
        })
    }

    /// Serves HTTP and runs the job engine until a shutdown signal arrives.
    pub async fn run(self) -> ShowtimeResult<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let workers = {
            let pool = self.worker_pool.clone();
            tokio::spawn(async move { pool.start().await })
        };
        let scheduler = {
            let scheduler = self.scheduler.clone();
            tokio::spawn(async move { scheduler.start().await })
        };
        let maintenance = tokio::spawn(run_maintenance(
            self.queue.clone(),
            self.config.jobs.clone(),
            shutdown_rx,
        ));

        let addr = self.config.server.addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| ShowtimeError::internal(format!("Failed to bind {addr}: {e}")))?;
        info!("Starting REST server on http://{}", addr);

        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ShowtimeError::internal(format!("REST server error: {e}")));

        info!("HTTP server stopped, draining background work...");
        self.scheduler.stop();
        self.worker_pool.stop();
        // Receivers only go away once maintenance has exited.
        let _ = shutdown_tx.send(true);

        join("scheduler", scheduler).await;
        join("worker pool", workers).await;
        join("maintenance", maintenance).await;

        self.database.close().await;
        info!("Server shutdown complete");
        served
    }
}

async fn join(name: &str, handle: JoinHandle<JobResult<()>>) {
    match handle.await {
        Ok(Ok(())) => debug!(task = name, "Background task finished"),
        Ok(Err(e)) => error!(task = name, error = %e, "Background task failed"),
        Err(e) => error!(task = name, error = %e, "Background task panicked"),
    }
}

/// Promotes due delayed jobs and purges old completed jobs.
async fn run_maintenance(
    queue: Arc<RedisJobQueue>,
    config: JobsConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JobResult<()> {
    let mut delayed = tokio::time::interval(DELAYED_POLL_INTERVAL);
    let mut purge = tokio::time::interval(PURGE_INTERVAL);

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            _ = delayed.tick() => {
                if let Err(e) = queue.process_delayed().await {
                    warn!(error = %e, "Failed to promote delayed jobs");
                }
            }
            _ = purge.tick() => {
                match queue.purge_completed(config.queue.retention()).await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "Purged completed jobs"),
                    Err(e) => warn!(error = %e, "Failed to purge completed jobs"),
                }
            }
        }
    }

    debug!("Queue maintenance stopped");
    Ok(())
}
