//! Email notifications. These only read state; they never touch seats or bookings.

use super::Workflows;
use crate::mailer::templates::{self, EmailContent};
use chrono::{DateTime, TimeDelta, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use showtime_core::{BookingId, MovieId, Show, ShowtimeError, ShowtimeResult, User, UserId};
use std::collections::{BTreeSet, HashMap};
use tracing::{info, instrument, warn};

/// Sends in flight at once during a fan-out.
const MAX_CONCURRENT_SENDS: usize = 16;

/// Outcome of a fan-out send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

impl DeliveryReport {
    fn record(&mut self, ok: bool) {
        if ok {
            self.sent += 1;
        } else {
            self.failed += 1;
        }
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.sent + self.failed
    }
}

/// One message to one recipient.
struct Outgoing {
    to: String,
    content: EmailContent,
}

impl Workflows {
    /// Sends every message concurrently, counting outcomes independently.
    async fn fan_out(&self, messages: Vec<Outgoing>) -> DeliveryReport {
        let results: Vec<bool> = stream::iter(messages)
            .map(|msg| async move {
                match self
                    .mailer
                    .send(&msg.to, &msg.content.subject, &msg.content.html)
                    .await
                {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(to = %msg.to, error = %e, "Email delivery failed");
                        false
                    }
                }
            })
            .buffer_unordered(MAX_CONCURRENT_SENDS)
            .collect()
            .await;

        let mut report = DeliveryReport::default();
        for ok in results {
            report.record(ok);
        }
        report
    }

    /// Handles `app/show.booked`: one confirmation to the booking's user.
    #[instrument(skip(self), fields(booking_id = %booking_id))]
    pub async fn send_booking_confirmation(&self, booking_id: BookingId) -> ShowtimeResult<()> {
        let booking = self
            .repos
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| ShowtimeError::not_found("Booking", booking_id))?;
        let show = self
            .repos
            .shows
            .find_by_id(booking.show_id)
            .await?
            .ok_or_else(|| ShowtimeError::not_found("Show", booking.show_id))?;
        let movie = self
            .repos
            .movies
            .find_by_id(&show.movie_id)
            .await?
            .ok_or_else(|| ShowtimeError::not_found("Movie", &show.movie_id))?;
        let user = self
            .repos
            .users
            .find_by_id(&booking.user_id)
            .await?
            .ok_or_else(|| ShowtimeError::not_found("User", &booking.user_id))?;

        let email =
            templates::booking_confirmation(&user, &booking, &show, &movie, &self.config.currency);
        self.mailer.send(&user.email, &email.subject, &email.html).await?;

        info!(user_id = %user.id, "Booking confirmation sent");
        Ok(())
    }

    /// Handles `app/show.added`: one email per user.
    #[instrument(skip(self))]
    pub async fn send_new_show_notifications(
        &self,
        movie_title: &str,
    ) -> ShowtimeResult<DeliveryReport> {
        let users = self.repos.users.find_all().await?;
        let messages = users
            .iter()
            .map(|user| Outgoing {
                to: user.email.clone(),
                content: templates::new_show(user, movie_title),
            })
            .collect();

        let report = self.fan_out(messages).await;
        info!(sent = report.sent, failed = report.failed, "New show notifications done");
        Ok(report)
    }

    /// Reminds every holder of seats in shows starting within the lookahead
    /// after `now`. One email per distinct (user, show) pair.
    #[instrument(skip(self))]
    pub async fn send_show_reminders(&self, now: DateTime<Utc>) -> ShowtimeResult<DeliveryReport> {
        let lookahead = TimeDelta::from_std(self.config.reminder_lookahead())
            .map_err(|e| ShowtimeError::Configuration(format!("Reminder lookahead: {e}")))?;
        let shows = self
            .repos
            .shows
            .find_starting_between(now, now + lookahead)
            .await?;

        let pairs: Vec<(UserId, &Show)> = shows
            .iter()
            .flat_map(|show| show.holders().into_iter().map(move |user| (user, show)))
            .collect();
        if pairs.is_empty() {
            info!(shows = shows.len(), "No reminders due");
            return Ok(DeliveryReport::default());
        }

        let user_ids: Vec<UserId> = pairs
            .iter()
            .map(|(id, _)| id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let users: HashMap<UserId, User> = self
            .repos
            .users
            .find_by_ids(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let movie_ids: Vec<MovieId> = shows
            .iter()
            .map(|s| s.movie_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let titles: HashMap<MovieId, String> = self
            .repos
            .movies
            .find_by_ids(&movie_ids)
            .await?
            .into_iter()
            .map(|m| (m.id, m.title))
            .collect();

        let mut report = DeliveryReport::default();
        let mut messages = Vec::with_capacity(pairs.len());
        for (user_id, show) in pairs {
            let (Some(user), Some(title)) = (users.get(&user_id), titles.get(&show.movie_id))
            else {
                warn!(user_id = %user_id, show_id = %show.id, "Cannot remind: user or movie missing");
                report.record(false);
                continue;
            };
            messages.push(Outgoing {
                to: user.email.clone(),
                content: templates::show_reminder(user, title, show),
            });
        }

        let sent = self.fan_out(messages).await;
        report.sent += sent.sent;
        report.failed += sent.failed;

        info!(
            shows = shows.len(),
            sent = report.sent,
            failed = report.failed,
            "Show reminders done"
        );
        Ok(report)
    }
}
