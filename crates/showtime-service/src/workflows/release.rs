//! Seat release for bookings left unpaid past the payment window.

use super::Workflows;
use serde::Serialize;
use showtime_core::{Booking, BookingId, ShowtimeError, ShowtimeResult};
use std::collections::BTreeSet;
use tracing::{debug, error, info, instrument, warn};

/// What a release run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReleaseOutcome {
    /// Seats were freed and the booking deleted.
    Released { seats: Vec<String> },
    /// The booking was paid in time; nothing changed.
    AlreadyPaid,
    /// The booking no longer exists, e.g. an earlier run released it.
    BookingMissing,
}

impl Workflows {
    /// Frees an unpaid booking's seats and deletes it.
    ///
    /// The booking is claimed first by a delete that only matches an unpaid
    /// row, so a payment committing concurrently either lands before the
    /// claim (and the booking is kept) or finds the booking gone. Only
    /// labels listed in the booking, still held by its user and not listed
    /// in another booking of that user for the same show are freed.
    #[instrument(skip(self), fields(booking_id = %booking_id))]
    pub async fn release_seats(&self, booking_id: BookingId) -> ShowtimeResult<ReleaseOutcome> {
        let Some(booking) = self.repos.bookings.find_by_id(booking_id).await? else {
            debug!("Booking already gone");
            return Ok(ReleaseOutcome::BookingMissing);
        };

        if booking.is_paid {
            debug!("Booking paid, keeping seats");
            return Ok(ReleaseOutcome::AlreadyPaid);
        }

        if !self.repos.bookings.delete_unpaid(booking.id).await? {
            return match self.repos.bookings.find_by_id(booking.id).await? {
                Some(current) if current.is_paid => {
                    debug!("Booking paid before release, keeping seats");
                    Ok(ReleaseOutcome::AlreadyPaid)
                }
                _ => Ok(ReleaseOutcome::BookingMissing),
            };
        }

        match self.release_holds(&booking).await {
            Ok(seats) => {
                info!(show_id = %booking.show_id, seats = ?seats, "Released seats of unpaid booking");
                Ok(ReleaseOutcome::Released { seats })
            }
            Err(e) => {
                // Put the booking back so the retried job finds it again.
                if let Err(restore) = self.repos.bookings.create(&booking).await {
                    error!(
                        error = %restore,
                        show_id = %booking.show_id,
                        seats = ?booking.booked_seats,
                        "Failed to restore booking after release error; its seats stay held"
                    );
                }
                Err(e)
            }
        }
    }

    /// Removes the booking's holds from its show with a version-checked write.
    async fn release_holds(&self, booking: &Booking) -> ShowtimeResult<Vec<String>> {
        let attempts = self.config.seat_write_attempts.max(1);

        for attempt in 1..=attempts {
            let Some(mut show) = self.repos.shows.find_by_id(booking.show_id).await? else {
                warn!(show_id = %booking.show_id, "Show of unpaid booking no longer exists");
                return Ok(Vec::new());
            };

            let labels = self.unshared_labels(booking).await?;
            let released = show.release_seats(&labels, &booking.user_id);
            if released.is_empty() || self.repos.shows.update_seats(&show).await? {
                return Ok(released);
            }
            debug!(attempt, "Show changed concurrently, retrying release");
        }

        Err(ShowtimeError::conflict(format!(
            "Seat map of show {} kept changing during release",
            booking.show_id
        )))
    }

    /// The booking's labels that no other booking of the same user for the
    /// same show lists.
    async fn unshared_labels(&self, booking: &Booking) -> ShowtimeResult<Vec<String>> {
        let kept: BTreeSet<String> = self
            .repos
            .bookings
            .find_by_user(&booking.user_id)
            .await?
            .into_iter()
            .filter(|other| other.id != booking.id && other.show_id == booking.show_id)
            .flat_map(|other| other.booked_seats)
            .collect();

        if !kept.is_empty() {
            debug!(kept = ?kept, "Labels held by the user's other bookings stay occupied");
        }
        Ok(booking
            .booked_seats
            .iter()
            .filter(|label| !kept.contains(*label))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::MockMailer;
    use crate::testing::{movie, InMemoryStore};
    use chrono::{Duration, Utc};
    use showtime_config::WorkflowConfig;
    use showtime_core::{Show, UserId};
    use std::sync::Arc;

    struct Fixture {
        store: InMemoryStore,
        workflows: Workflows,
    }

    fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let workflows = Workflows::new(
            store.repositories(),
            Arc::new(MockMailer::new()),
            WorkflowConfig::default(),
        );
        Fixture { store, workflows }
    }

    fn seats(labels: &[&str]) -> Vec<String> {
        labels.iter().map(ToString::to_string).collect()
    }

    /// Puts a show on sale and books `labels` on it for `user`.
    fn book(store: &InMemoryStore, show: &mut Show, user: &str, labels: &[&str]) -> Booking {
        let user = UserId::new(user);
        show.claim_seats(&seats(labels), &user).unwrap();
        store.shows.insert(show.clone());
        let booking = Booking::new(user, show.id, 1200 * labels.len() as i64, seats(labels));
        store.bookings.insert(booking.clone());
        booking
    }

    fn new_show(store: &InMemoryStore) -> Show {
        store.movies.insert(movie("550", "Fight Club"));
        Show::new("550".into(), Utc::now() + Duration::days(1), 1200)
    }

    #[tokio::test]
    async fn test_unpaid_booking_releases_seats_and_is_deleted() {
        let Fixture { store, workflows } = fixture();
        let mut show = new_show(&store);
        let b1 = book(&store, &mut show, "U1", &["A1", "A2"]);

        let outcome = workflows.release_seats(b1.id).await.unwrap();

        assert_eq!(outcome, ReleaseOutcome::Released { seats: seats(&["A1", "A2"]) });
        let show = store.shows.get(show.id).unwrap();
        assert!(show.is_free("A1"));
        assert!(show.is_free("A2"));
        assert!(store.bookings.get(b1.id).is_none());
    }

    #[tokio::test]
    async fn test_paid_booking_is_untouched() {
        let Fixture { store, workflows } = fixture();
        let mut show = new_show(&store);
        let mut booking = book(&store, &mut show, "U1", &["A1"]);
        booking.mark_paid();
        store.bookings.insert(booking.clone());

        let outcome = workflows.release_seats(booking.id).await.unwrap();

        assert_eq!(outcome, ReleaseOutcome::AlreadyPaid);
        assert_eq!(store.bookings.get(booking.id), Some(booking));
        assert_eq!(store.shows.get(show.id).unwrap().occupied_seats, show.occupied_seats);
    }

    #[tokio::test]
    async fn test_second_run_is_a_noop() {
        let Fixture { store, workflows } = fixture();
        let mut show = new_show(&store);
        let booking = book(&store, &mut show, "U1", &["A1"]);

        workflows.release_seats(booking.id).await.unwrap();
        let again = workflows.release_seats(booking.id).await.unwrap();

        assert_eq!(again, ReleaseOutcome::BookingMissing);
    }

    #[tokio::test]
    async fn test_other_bookings_on_the_show_keep_their_seats() {
        let Fixture { store, workflows } = fixture();
        let mut show = new_show(&store);
        let b1 = book(&store, &mut show, "U1", &["A1", "A2"]);
        let b2 = book(&store, &mut show, "U2", &["B1"]);

        workflows.release_seats(b1.id).await.unwrap();

        let show = store.shows.get(show.id).unwrap();
        assert_eq!(show.occupied_seats.get("B1"), Some(&UserId::new("U2")));
        assert!(store.bookings.get(b2.id).is_some());
    }

    #[tokio::test]
    async fn test_resold_label_stays_with_new_holder() {
        let Fixture { store, workflows } = fixture();
        let mut show = new_show(&store);
        let b1 = book(&store, &mut show, "U1", &["A1", "A2"]);

        // A1 was freed and sold to U2 in the meantime.
        show.occupied_seats.insert("A1".into(), UserId::new("U2"));
        store.shows.insert(show.clone());

        let outcome = workflows.release_seats(b1.id).await.unwrap();

        assert_eq!(outcome, ReleaseOutcome::Released { seats: seats(&["A2"]) });
        let show = store.shows.get(show.id).unwrap();
        assert_eq!(show.occupied_seats.get("A1"), Some(&UserId::new("U2")));
    }

    #[tokio::test]
    async fn test_version_conflict_is_retried() {
        let Fixture { store, workflows } = fixture();
        let mut show = new_show(&store);
        let booking = book(&store, &mut show, "U1", &["A1"]);
        store.shows.force_conflicts(2);

        let outcome = workflows.release_seats(booking.id).await.unwrap();

        assert_eq!(outcome, ReleaseOutcome::Released { seats: seats(&["A1"]) });
        assert!(store.shows.get(show.id).unwrap().is_free("A1"));
    }

    #[tokio::test]
    async fn test_persistent_conflict_fails_retriably_and_keeps_booking() {
        let Fixture { store, workflows } = fixture();
        let mut show = new_show(&store);
        let booking = book(&store, &mut show, "U1", &["A1"]);
        store.shows.force_conflicts(10);

        let err = workflows.release_seats(booking.id).await.unwrap_err();

        assert!(err.is_retriable());
        assert!(store.bookings.get(booking.id).is_some());
        assert_eq!(store.shows.get(show.id).unwrap().occupied_seats.len(), 1);
    }

    #[tokio::test]
    async fn test_payment_committed_during_release_keeps_booking_and_seats() {
        let store = InMemoryStore::new();
        let (repos, bookings) = store.interleaved();
        let workflows = Workflows::new(repos, Arc::new(MockMailer::new()), WorkflowConfig::default());
        let mut show = new_show(&store);
        let booking = book(&store, &mut show, "U1", &["A1"]);
        let id = booking.id;
        bookings.before_next_write(move |rows| rows.pay(id));

        let outcome = workflows.release_seats(booking.id).await.unwrap();

        assert_eq!(outcome, ReleaseOutcome::AlreadyPaid);
        assert!(store.bookings.get(booking.id).unwrap().is_paid);
        assert_eq!(
            store.shows.get(show.id).unwrap().occupied_seats.get("A1"),
            Some(&UserId::new("U1"))
        );
    }

    #[tokio::test]
    async fn test_booking_removed_during_release_is_missing() {
        let store = InMemoryStore::new();
        let (repos, bookings) = store.interleaved();
        let workflows = Workflows::new(repos, Arc::new(MockMailer::new()), WorkflowConfig::default());
        let mut show = new_show(&store);
        let booking = book(&store, &mut show, "U1", &["A1"]);
        let id = booking.id;
        bookings.before_next_write(move |rows| {
            rows.remove(id);
        });

        let outcome = workflows.release_seats(booking.id).await.unwrap();

        assert_eq!(outcome, ReleaseOutcome::BookingMissing);
        assert!(!store.shows.get(show.id).unwrap().is_free("A1"));
    }

    #[tokio::test]
    async fn test_seat_rebooked_by_same_user_stays_held() {
        let Fixture { store, workflows } = fixture();
        let mut show = new_show(&store);
        let b1 = book(&store, &mut show, "U1", &["A1", "A2"]);

        // A1 was freed once and the same user booked and paid for it again.
        let mut b2 = Booking::new(UserId::new("U1"), show.id, 1200, seats(&["A1"]));
        b2.mark_paid();
        store.bookings.insert(b2.clone());

        let outcome = workflows.release_seats(b1.id).await.unwrap();

        assert_eq!(outcome, ReleaseOutcome::Released { seats: seats(&["A2"]) });
        let show = store.shows.get(show.id).unwrap();
        assert_eq!(show.occupied_seats.get("A1"), Some(&UserId::new("U1")));
        assert!(show.is_free("A2"));
        assert!(store.bookings.get(b1.id).is_none());
        assert!(store.bookings.get(b2.id).unwrap().is_paid);
    }

    #[tokio::test]
    async fn test_bookings_of_same_user_for_other_shows_do_not_protect_seats() {
        let Fixture { store, workflows } = fixture();
        let mut show = new_show(&store);
        let b1 = book(&store, &mut show, "U1", &["A1"]);
        let other = Show::new("550".into(), Utc::now() + Duration::days(2), 1200);
        store
            .bookings
            .insert(Booking::new(UserId::new("U1"), other.id, 1200, seats(&["A1"])));

        let outcome = workflows.release_seats(b1.id).await.unwrap();

        assert_eq!(outcome, ReleaseOutcome::Released { seats: seats(&["A1"]) });
    }
}
