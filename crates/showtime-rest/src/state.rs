//! Application state for Axum handlers.

use crate::security::WebhookVerifier;
use showtime_jobs::{JobQueue, Scheduler};
use showtime_repository::DatabasePool;
use showtime_service::{BookingService, EventBus, ShowService, UserService};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub booking_service: Arc<BookingService>,
    pub show_service: Arc<ShowService>,
    pub user_service: Arc<UserService>,
    pub events: Arc<dyn EventBus>,
    pub job_queue: Arc<dyn JobQueue>,
    pub scheduler: Arc<Scheduler>,
    /// Pinged by the readiness check when present.
    pub database: Option<DatabasePool>,
    /// `None` when no Clerk webhook secret is configured.
    pub webhook_verifier: Option<Arc<WebhookVerifier>>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        booking_service: Arc<BookingService>,
        show_service: Arc<ShowService>,
        user_service: Arc<UserService>,
        events: Arc<dyn EventBus>,
        job_queue: Arc<dyn JobQueue>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        Self {
            booking_service,
            show_service,
            user_service,
            events,
            job_queue,
            scheduler,
            database: None,
            webhook_verifier: None,
        }
    }

    #[must_use]
    pub fn with_database(mut self, database: DatabasePool) -> Self {
        self.database = Some(database);
        self
    }

    #[must_use]
    pub fn with_webhook_verifier(mut self, verifier: WebhookVerifier) -> Self {
        self.webhook_verifier = Some(Arc::new(verifier));
        self
    }
}
