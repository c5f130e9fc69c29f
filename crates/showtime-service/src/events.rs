//! Routes application events to the jobs that handle them.

use crate::jobs::{
    BookingConfirmationJob, DeleteUserJob, NewShowNotificationsJob, ReleaseSeatsJob, SyncUserJob,
    UpdateUserJob,
};
use async_trait::async_trait;
use showtime_core::{AppEvent, ShowtimeResult};
use showtime_jobs::{JobData, JobError, JobId, JobQueue, JobResult, QueuedJob};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Publishes events for asynchronous handling.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Returns the id of the job created for the event, or `None` when an
    /// equivalent job was already pending.
    async fn publish(&self, event: AppEvent) -> ShowtimeResult<Option<JobId>>;
}

/// Builds the job record for an event.
///
/// `app/checkpayment` is deferred by `payment_window`; every other event
/// runs as soon as a worker is free.
pub fn route(event: AppEvent, payment_window: Duration) -> JobResult<JobData> {
    match event {
        AppEvent::UserCreated(data) => QueuedJob::new(SyncUserJob(data)).build(),
        AppEvent::UserUpdated(data) => QueuedJob::new(UpdateUserJob(data)).build(),
        AppEvent::UserDeleted(data) => QueuedJob::new(DeleteUserJob(data)).build(),
        AppEvent::CheckPayment(r) => QueuedJob::new(ReleaseSeatsJob {
            booking_id: r.booking_id,
        })
        .delay(payment_window)
        .correlation_id(r.booking_id.to_string())
        .build(),
        AppEvent::ShowBooked(r) => QueuedJob::new(BookingConfirmationJob {
            booking_id: r.booking_id,
        })
        .correlation_id(r.booking_id.to_string())
        .build(),
        AppEvent::ShowAdded(added) => QueuedJob::new(NewShowNotificationsJob {
            movie_title: added.movie_title,
        })
        .build(),
    }
}

/// [`EventBus`] that enqueues onto the durable job queue.
#[derive(Clone)]
pub struct QueueEventBus {
    queue: Arc<dyn JobQueue>,
    payment_window: Duration,
}

impl QueueEventBus {
    pub fn new(queue: Arc<dyn JobQueue>, payment_window: Duration) -> Self {
        Self {
            queue,
            payment_window,
        }
    }
}

#[async_trait]
impl EventBus for QueueEventBus {
    async fn publish(&self, event: AppEvent) -> ShowtimeResult<Option<JobId>> {
        let name = event.name();
        let data = route(event, self.payment_window)?;
        let job_name = data.name.clone();

        match self.queue.enqueue_data(data).await {
            Ok(job_id) => {
                info!(event = name, job = %job_name, job_id = %job_id, "Event published");
                Ok(Some(job_id))
            }
            Err(JobError::Duplicate(key)) => {
                debug!(event = name, unique_key = %key, "Equivalent job already pending");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use showtime_core::{BookingId, BookingRef, ShowAdded};
    use showtime_jobs::MockJobQueue;

    #[test]
    fn test_checkpayment_is_delayed_by_window() {
        let booking_id = BookingId::new();
        let before = Utc::now();
        let data = route(
            AppEvent::CheckPayment(BookingRef { booking_id }),
            Duration::from_secs(600),
        )
        .unwrap();

        assert_eq!(data.name, "release-seats-delete-booking");
        assert!(data.scheduled_at >= before + chrono::Duration::seconds(600));
        assert_eq!(data.unique_key, Some(format!("release:{booking_id}")));
    }

    #[test]
    fn test_show_added_runs_immediately() {
        let before = Utc::now();
        let data = route(
            AppEvent::ShowAdded(ShowAdded {
                movie_title: "Fight Club".into(),
            }),
            Duration::from_secs(600),
        )
        .unwrap();

        assert_eq!(data.name, "send-new-show-notifications");
        assert!(data.scheduled_at < before + chrono::Duration::seconds(5));
    }

    #[tokio::test]
    async fn test_duplicate_release_is_not_an_error() {
        let mut queue = MockJobQueue::new();
        queue
            .expect_enqueue_data()
            .returning(|data| Err(JobError::Duplicate(data.unique_key.unwrap_or_default())));

        let bus = QueueEventBus::new(Arc::new(queue), Duration::from_secs(600));
        let result = bus
            .publish(AppEvent::CheckPayment(BookingRef {
                booking_id: BookingId::new(),
            }))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_queue_failure_propagates() {
        let mut queue = MockJobQueue::new();
        queue
            .expect_enqueue_data()
            .returning(|_| Err(JobError::Internal("boom".into())));

        let bus = QueueEventBus::new(Arc::new(queue), Duration::from_secs(600));
        let err = bus
            .publish(AppEvent::ShowBooked(BookingRef {
                booking_id: BookingId::new(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
    }
}
