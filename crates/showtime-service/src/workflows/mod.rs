//! Background workflows and their registration on the job engine.
//!
//! Each workflow is a plain async method on [`Workflows`]; the job engine
//! only decodes the payload and calls it. Workflows read committed state on
//! every run and keep nothing in memory between runs, so at-least-once
//! delivery is safe.

mod notifications;
mod release;
mod user_sync;

pub use notifications::DeliveryReport;
pub use release::ReleaseOutcome;

use crate::jobs::{
    BookingConfirmationJob, DeleteUserJob, NewShowNotificationsJob, ReleaseSeatsJob,
    ShowRemindersJob, SyncUserJob, UpdateUserJob,
};
use crate::mailer::Mailer;
use crate::repositories::Repositories;
use chrono::Utc;
use showtime_core::UserId;
use showtime_config::WorkflowConfig;
use showtime_jobs::{JobError, JobResult, Scheduler, WorkerPool};
use std::sync::Arc;
use tracing::info;

/// Name of the recurring reminder entry on the scheduler.
pub const REMINDER_SCHEDULE: &str = "show-reminders";

pub struct Workflows {
    repos: Repositories,
    mailer: Arc<dyn Mailer>,
    config: WorkflowConfig,
}

impl Workflows {
    pub fn new(repos: Repositories, mailer: Arc<dyn Mailer>, config: WorkflowConfig) -> Self {
        Self {
            repos,
            mailer,
            config,
        }
    }
}

/// Registers a handler for every workflow job.
pub fn register_handlers(pool: &WorkerPool, workflows: &Arc<Workflows>) {
    let wf = Arc::clone(workflows);
    pool.register::<ReleaseSeatsJob, _, _>(move |job, _ctx| {
        let wf = Arc::clone(&wf);
        async move {
            wf.release_seats(job.booking_id)
                .await
                .map(drop)
                .map_err(JobError::from)
        }
    });

    let wf = Arc::clone(workflows);
    pool.register::<SyncUserJob, _, _>(move |job, _ctx| {
        let wf = Arc::clone(&wf);
        async move { wf.sync_user_created(&job.0).await.map(drop).map_err(JobError::from) }
    });

    let wf = Arc::clone(workflows);
    pool.register::<UpdateUserJob, _, _>(move |job, _ctx| {
        let wf = Arc::clone(&wf);
        async move { wf.sync_user_updated(&job.0).await.map(drop).map_err(JobError::from) }
    });

    let wf = Arc::clone(workflows);
    pool.register::<DeleteUserJob, _, _>(move |job, _ctx| {
        let wf = Arc::clone(&wf);
        async move {
            wf.sync_user_deleted(&UserId::new(job.0.id))
                .await
                .map(drop)
                .map_err(JobError::from)
        }
    });

    let wf = Arc::clone(workflows);
    pool.register::<BookingConfirmationJob, _, _>(move |job, _ctx| {
        let wf = Arc::clone(&wf);
        async move {
            wf.send_booking_confirmation(job.booking_id)
                .await
                .map_err(JobError::from)
        }
    });

    let wf = Arc::clone(workflows);
    pool.register::<NewShowNotificationsJob, _, _>(move |job, _ctx| {
        let wf = Arc::clone(&wf);
        async move {
            wf.send_new_show_notifications(&job.movie_title)
                .await
                .map(drop)
                .map_err(JobError::from)
        }
    });

    let wf = Arc::clone(workflows);
    pool.register::<ShowRemindersJob, _, _>(move |_job, _ctx| {
        let wf = Arc::clone(&wf);
        async move {
            wf.send_show_reminders(Utc::now())
                .await
                .map(drop)
                .map_err(JobError::from)
        }
    });

    info!(handlers = ?pool.registered(), "Workflow handlers registered");
}

/// Puts the show reminder on its cron schedule.
pub fn schedule_reminders(scheduler: &Scheduler, cron: &str) -> JobResult<()> {
    scheduler.schedule(REMINDER_SCHEDULE, cron, || ShowRemindersJob)
}
