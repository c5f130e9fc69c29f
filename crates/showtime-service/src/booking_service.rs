//! Seat booking and payment confirmation.

use crate::dto::{BookingDetails, CreateBookingRequest, ShowDetails};
use crate::events::EventBus;
use crate::repositories::Repositories;
use crate::validation::ValidateExt;
use showtime_core::{
    AppEvent, Booking, BookingId, BookingRef, Movie, MovieId, Show, ShowId, ShowtimeError,
    ShowtimeResult, UserId,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub struct BookingService {
    repos: Repositories,
    events: Arc<dyn EventBus>,
    seat_write_attempts: u32,
}

impl BookingService {
    pub fn new(repos: Repositories, events: Arc<dyn EventBus>, seat_write_attempts: u32) -> Self {
        Self {
            repos,
            events,
            seat_write_attempts: seat_write_attempts.max(1),
        }
    }

    /// Claims the selected seats and creates an unpaid booking.
    ///
    /// The seats stay held for the payment window; `app/checkpayment` is
    /// published so they are released if payment never arrives.
    #[instrument(skip(self, request), fields(user_id = %user_id, show_id = %request.show_id))]
    pub async fn create_booking(
        &self,
        user_id: &UserId,
        request: CreateBookingRequest,
    ) -> ShowtimeResult<Booking> {
        request.validate_request()?;

        let show = self
            .claim_seats(request.show_id, &request.selected_seats, user_id)
            .await?;

        let seat_count = i64::try_from(request.selected_seats.len())
            .map_err(|_| ShowtimeError::validation("Too many seats"))?;
        let amount = show
            .show_price
            .checked_mul(seat_count)
            .ok_or_else(|| ShowtimeError::validation("Booking amount overflows"))?;

        let booking = Booking::new(user_id.clone(), show.id, amount, request.selected_seats);
        let booking = match self.repos.bookings.create(&booking).await {
            Ok(created) => created,
            Err(e) => {
                self.rollback(&booking).await;
                return Err(e);
            }
        };

        if let Err(e) = self
            .events
            .publish(AppEvent::CheckPayment(BookingRef {
                booking_id: booking.id,
            }))
            .await
        {
            error!(booking_id = %booking.id, error = %e, "Could not schedule seat release");
            self.rollback(&booking).await;
            self.repos.bookings.delete(booking.id).await?;
            return Err(e);
        }

        info!(booking_id = %booking.id, seats = ?booking.booked_seats, amount, "Booking created");
        Ok(booking)
    }

    /// Marks the selected labels as held by `user_id` with a version-checked write.
    async fn claim_seats(
        &self,
        show_id: ShowId,
        labels: &[String],
        user_id: &UserId,
    ) -> ShowtimeResult<Show> {
        for attempt in 1..=self.seat_write_attempts {
            let mut show = self
                .repos
                .shows
                .find_by_id(show_id)
                .await?
                .ok_or_else(|| ShowtimeError::not_found("Show", show_id))?;

            show.claim_seats(labels, user_id)?;
            if self.repos.shows.update_seats(&show).await? {
                return Ok(show);
            }
            debug!(attempt, "Show changed concurrently, retrying claim");
        }

        Err(ShowtimeError::conflict(
            "Seats are being booked by others, please try again",
        ))
    }

    /// Best-effort undo of a claim whose booking could not be completed.
    async fn rollback(&self, booking: &Booking) {
        for _ in 0..self.seat_write_attempts {
            let mut show = match self.repos.shows.find_by_id(booking.show_id).await {
                Ok(Some(show)) => show,
                Ok(None) => return,
                Err(e) => {
                    warn!(show_id = %booking.show_id, error = %e, "Seat rollback failed");
                    return;
                }
            };
            if show.release_seats(&booking.booked_seats, &booking.user_id).is_empty() {
                return;
            }
            match self.repos.shows.update_seats(&show).await {
                Ok(true) => return,
                Ok(false) => continue,
                Err(e) => {
                    warn!(show_id = %booking.show_id, error = %e, "Seat rollback failed");
                    return;
                }
            }
        }
        warn!(show_id = %booking.show_id, "Seat rollback gave up after repeated conflicts");
    }

    /// Labels currently held on a show.
    pub async fn occupied_seats(&self, show_id: ShowId) -> ShowtimeResult<Vec<String>> {
        let show = self
            .repos
            .shows
            .find_by_id(show_id)
            .await?
            .ok_or_else(|| ShowtimeError::not_found("Show", show_id))?;
        Ok(show.occupied_labels())
    }

    /// Marks the caller's booking paid and triggers the confirmation email.
    ///
    /// Confirming an already-paid booking changes nothing and sends nothing.
    #[instrument(skip(self), fields(user_id = %user_id, booking_id = %booking_id))]
    pub async fn confirm_payment(
        &self,
        user_id: &UserId,
        booking_id: BookingId,
    ) -> ShowtimeResult<Booking> {
        let mut booking = self
            .repos
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| ShowtimeError::not_found("Booking", booking_id))?;

        if &booking.user_id != user_id {
            return Err(ShowtimeError::forbidden("Booking belongs to another user"));
        }

        if !booking.mark_paid() {
            debug!("Booking already paid");
            return Ok(booking);
        }

        // The write only lands on an unpaid row, so a release or another
        // confirmation that got there first wins.
        if !self.repos.bookings.update_payment(&booking).await? {
            return match self.repos.bookings.find_by_id(booking_id).await? {
                Some(current) if current.is_paid => {
                    debug!("Booking paid concurrently");
                    Ok(current)
                }
                _ => Err(ShowtimeError::not_found("Booking", booking_id)),
            };
        }

        self.events
            .publish(AppEvent::ShowBooked(BookingRef { booking_id }))
            .await?;

        info!("Booking paid");
        Ok(booking)
    }

    /// The user's bookings, newest first, with show and movie attached.
    pub async fn user_bookings(&self, user_id: &UserId) -> ShowtimeResult<Vec<BookingDetails>> {
        let bookings = self.repos.bookings.find_by_user(user_id).await?;

        let show_ids: Vec<ShowId> = bookings
            .iter()
            .map(|b| b.show_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let shows: HashMap<ShowId, Show> = self
            .repos
            .shows
            .find_by_ids(&show_ids)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let movie_ids: Vec<MovieId> = shows
            .values()
            .map(|s| s.movie_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let movies: HashMap<MovieId, Movie> = self
            .repos
            .movies
            .find_by_ids(&movie_ids)
            .await?
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect();

        Ok(bookings
            .into_iter()
            .map(|booking| {
                let show = shows.get(&booking.show_id).map(|show| ShowDetails {
                    movie: movies.get(&show.movie_id).cloned(),
                    show: show.clone(),
                });
                BookingDetails { booking, show }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{movie, InMemoryStore, InterleavedBookings, RecordingEventBus};
    use chrono::{Duration, Utc};

    struct Fixture {
        store: InMemoryStore,
        events: Arc<RecordingEventBus>,
        service: BookingService,
        show: Show,
    }

    fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        store.movies.insert(movie("550", "Fight Club"));
        let show = Show::new("550".into(), Utc::now() + Duration::days(1), 1250);
        store.shows.insert(show.clone());

        let events = Arc::new(RecordingEventBus::default());
        let service = BookingService::new(store.repositories(), events.clone(), 3);
        Fixture {
            store,
            events,
            service,
            show,
        }
    }

    fn request(show_id: ShowId, labels: &[&str]) -> CreateBookingRequest {
        CreateBookingRequest {
            show_id,
            selected_seats: labels.iter().map(ToString::to_string).collect(),
        }
    }

    #[tokio::test]
    async fn test_booking_claims_seats_and_schedules_release() {
        let f = fixture();
        let user = UserId::new("U1");

        let booking = f
            .service
            .create_booking(&user, request(f.show.id, &["A1", "A2"]))
            .await
            .unwrap();

        assert_eq!(booking.amount, 2500);
        assert!(!booking.is_paid);
        let show = f.store.shows.get(f.show.id).unwrap();
        assert_eq!(show.occupied_seats.get("A1"), Some(&user));
        assert_eq!(
            f.events.events(),
            vec![AppEvent::CheckPayment(BookingRef {
                booking_id: booking.id
            })]
        );
    }

    #[tokio::test]
    async fn test_taken_seat_is_a_conflict() {
        let f = fixture();
        f.service
            .create_booking(&UserId::new("U1"), request(f.show.id, &["A1"]))
            .await
            .unwrap();

        let err = f
            .service
            .create_booking(&UserId::new("U2"), request(f.show.id, &["A1", "A2"]))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 409);
        assert!(f.store.shows.get(f.show.id).unwrap().is_free("A2"));
    }

    #[tokio::test]
    async fn test_empty_selection_is_rejected() {
        let f = fixture();
        let err = f
            .service
            .create_booking(&UserId::new("U1"), request(f.show.id, &[]))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_lost_version_race_is_retried() {
        let f = fixture();
        f.store.shows.force_conflicts(1);

        let booking = f
            .service
            .create_booking(&UserId::new("U1"), request(f.show.id, &["C3"]))
            .await
            .unwrap();
        assert_eq!(booking.booked_seats, vec!["C3".to_string()]);
    }

    #[tokio::test]
    async fn test_persistent_contention_is_a_conflict() {
        let f = fixture();
        f.store.shows.force_conflicts(5);

        let err = f
            .service
            .create_booking(&UserId::new("U1"), request(f.show.id, &["C3"]))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 409);
        assert!(f.events.events().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_payment_emits_once() {
        let f = fixture();
        let user = UserId::new("U1");
        let booking = f
            .service
            .create_booking(&user, request(f.show.id, &["A1"]))
            .await
            .unwrap();

        let paid = f.service.confirm_payment(&user, booking.id).await.unwrap();
        assert!(paid.is_paid);
        f.service.confirm_payment(&user, booking.id).await.unwrap();

        let booked: Vec<_> = f
            .events
            .events()
            .into_iter()
            .filter(|e| matches!(e, AppEvent::ShowBooked(_)))
            .collect();
        assert_eq!(booked.len(), 1);
        assert!(f.store.bookings.get(booking.id).unwrap().is_paid);
    }

    fn interleaved_fixture() -> (Fixture, Arc<InterleavedBookings>) {
        let f = fixture();
        let (repos, bookings) = f.store.interleaved();
        let service = BookingService::new(repos, f.events.clone(), 3);
        (Fixture { service, ..f }, bookings)
    }

    #[tokio::test]
    async fn test_payment_after_release_claimed_booking_is_not_found() {
        let (f, bookings) = interleaved_fixture();
        let user = UserId::new("U1");
        let booking = f
            .service
            .create_booking(&user, request(f.show.id, &["A1"]))
            .await
            .unwrap();
        let id = booking.id;
        bookings.before_next_write(move |rows| {
            rows.remove(id);
        });

        let err = f.service.confirm_payment(&user, booking.id).await.unwrap_err();

        assert_eq!(err.status_code(), 404);
        assert!(!f
            .events
            .events()
            .iter()
            .any(|e| matches!(e, AppEvent::ShowBooked(_))));
    }

    #[tokio::test]
    async fn test_concurrent_confirmation_emits_once() {
        let (f, bookings) = interleaved_fixture();
        let user = UserId::new("U1");
        let booking = f
            .service
            .create_booking(&user, request(f.show.id, &["A1"]))
            .await
            .unwrap();
        let id = booking.id;
        bookings.before_next_write(move |rows| rows.pay(id));

        let paid = f.service.confirm_payment(&user, booking.id).await.unwrap();

        assert!(paid.is_paid);
        assert!(!f
            .events
            .events()
            .iter()
            .any(|e| matches!(e, AppEvent::ShowBooked(_))));
    }

    #[tokio::test]
    async fn test_only_owner_can_confirm() {
        let f = fixture();
        let booking = f
            .service
            .create_booking(&UserId::new("U1"), request(f.show.id, &["A1"]))
            .await
            .unwrap();

        let err = f
            .service
            .confirm_payment(&UserId::new("U2"), booking.id)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_user_bookings_include_show_and_movie() {
        let f = fixture();
        let user = UserId::new("U1");
        f.service
            .create_booking(&user, request(f.show.id, &["A1"]))
            .await
            .unwrap();

        let bookings = f.service.user_bookings(&user).await.unwrap();

        assert_eq!(bookings.len(), 1);
        let show = bookings[0].show.as_ref().unwrap();
        assert_eq!(show.movie.as_ref().unwrap().title, "Fight Club");
    }

    #[tokio::test]
    async fn test_occupied_seats_of_unknown_show() {
        let f = fixture();
        let err = f.service.occupied_seats(ShowId::new()).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
