//! Payloads of the background jobs, one per workflow.

use serde::{Deserialize, Serialize};
use showtime_core::{BookingId, ClerkDeletedUser, ClerkUserData};
use showtime_jobs::{Job, RetryPolicy};
use std::time::Duration;

pub mod queues {
    pub const BOOKINGS: &str = "bookings";
    pub const USERS: &str = "users";
    pub const NOTIFICATIONS: &str = "notifications";
}

/// Releases an unpaid booking's seats once the payment window closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSeatsJob {
    pub booking_id: BookingId,
}

impl Job for ReleaseSeatsJob {
    const NAME: &'static str = "release-seats-delete-booking";
    const QUEUE: &'static str = queues::BOOKINGS;
    const MAX_RETRIES: u32 = 5;
    const TIMEOUT_SECS: u64 = 60;

    fn unique_key(&self) -> Option<String> {
        Some(format!("release:{}", self.booking_id))
    }
}

/// Mirrors a newly created identity-provider user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncUserJob(pub ClerkUserData);

impl Job for SyncUserJob {
    const NAME: &'static str = "sync-user-from-clerk";
    const QUEUE: &'static str = queues::USERS;
    const TIMEOUT_SECS: u64 = 30;
}

/// Applies a profile update from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateUserJob(pub ClerkUserData);

impl Job for UpdateUserJob {
    const NAME: &'static str = "update-user-from-clerk";
    const QUEUE: &'static str = queues::USERS;
    const TIMEOUT_SECS: u64 = 30;
}

/// Removes a user deleted at the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeleteUserJob(pub ClerkDeletedUser);

impl Job for DeleteUserJob {
    const NAME: &'static str = "delete-user-with-clerk";
    const QUEUE: &'static str = queues::USERS;
    const TIMEOUT_SECS: u64 = 30;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmationJob {
    pub booking_id: BookingId,
}

impl Job for BookingConfirmationJob {
    const NAME: &'static str = "send-booking-confirmation-email";
    const QUEUE: &'static str = queues::NOTIFICATIONS;

    fn unique_key(&self) -> Option<String> {
        Some(format!("confirmation:{}", self.booking_id))
    }
}

/// Tells every user about a newly scheduled movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShowNotificationsJob {
    pub movie_title: String,
}

impl Job for NewShowNotificationsJob {
    const NAME: &'static str = "send-new-show-notifications";
    const QUEUE: &'static str = queues::NOTIFICATIONS;
    const TIMEOUT_SECS: u64 = 600;

    // Partial failures are reported, not retried; a retry would re-send to everyone.
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(1, Duration::from_secs(60))
    }
}

/// Emails holders of seats in shows starting soon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowRemindersJob;

impl Job for ShowRemindersJob {
    const NAME: &'static str = "send-show-reminders";
    const QUEUE: &'static str = queues::NOTIFICATIONS;
    const TIMEOUT_SECS: u64 = 600;

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(1, Duration::from_secs(60))
    }
}
