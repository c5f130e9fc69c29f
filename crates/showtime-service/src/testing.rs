//! In-memory repositories and recording fakes for tests.

use crate::events::EventBus;
use crate::repositories::Repositories;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use showtime_core::{
    AppEvent, Booking, BookingId, Movie, MovieId, Show, ShowId, ShowtimeError, ShowtimeResult,
    User, UserId,
};
use showtime_jobs::JobId;
use showtime_repository::{BookingRepository, MovieRepository, ShowRepository, UserRepository};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Default)]
pub struct InMemoryUsers {
    rows: Mutex<BTreeMap<UserId, User>>,
}

impl InMemoryUsers {
    pub fn insert(&self, user: User) {
        self.rows.lock().insert(user.id.clone(), user);
    }

    #[must_use]
    pub fn get(&self, id: &UserId) -> Option<User> {
        self.rows.lock().get(id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn find_by_id(&self, id: &UserId) -> ShowtimeResult<Option<User>> {
        Ok(self.get(id))
    }

    async fn find_all(&self) -> ShowtimeResult<Vec<User>> {
        Ok(self.rows.lock().values().cloned().collect())
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> ShowtimeResult<Vec<User>> {
        let rows = self.rows.lock();
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }

    async fn create(&self, user: &User) -> ShowtimeResult<User> {
        let mut rows = self.rows.lock();
        if rows.contains_key(&user.id) {
            return Err(ShowtimeError::conflict(format!("User {} already exists", user.id)));
        }
        rows.insert(user.id.clone(), user.clone());
        Ok(user.clone())
    }

    async fn update(&self, user: &User) -> ShowtimeResult<bool> {
        let mut rows = self.rows.lock();
        match rows.get_mut(&user.id) {
            Some(row) => {
                row.name.clone_from(&user.name);
                row.email.clone_from(&user.email);
                row.image.clone_from(&user.image);
                row.updated_at = user.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &UserId) -> ShowtimeResult<bool> {
        Ok(self.rows.lock().remove(id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryMovies {
    rows: Mutex<BTreeMap<MovieId, Movie>>,
}

impl InMemoryMovies {
    pub fn insert(&self, movie: Movie) {
        self.rows.lock().insert(movie.id.clone(), movie);
    }

    #[must_use]
    pub fn get(&self, id: &MovieId) -> Option<Movie> {
        self.rows.lock().get(id).cloned()
    }
}

#[async_trait]
impl MovieRepository for InMemoryMovies {
    async fn find_by_id(&self, id: &MovieId) -> ShowtimeResult<Option<Movie>> {
        Ok(self.get(id))
    }

    async fn find_by_ids(&self, ids: &[MovieId]) -> ShowtimeResult<Vec<Movie>> {
        let rows = self.rows.lock();
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }

    async fn save(&self, movie: &Movie) -> ShowtimeResult<Movie> {
        self.insert(movie.clone());
        Ok(movie.clone())
    }
}

/// Shows with version-checked seat writes.
#[derive(Default)]
pub struct InMemoryShows {
    rows: Mutex<BTreeMap<ShowId, Show>>,
    /// Upcoming seat writes to reject as if another writer won.
    forced_conflicts: Mutex<u32>,
}

impl InMemoryShows {
    pub fn insert(&self, show: Show) {
        self.rows.lock().insert(show.id, show);
    }

    #[must_use]
    pub fn get(&self, id: ShowId) -> Option<Show> {
        self.rows.lock().get(&id).cloned()
    }

    /// Makes the next `n` seat writes lose the version race.
    pub fn force_conflicts(&self, n: u32) {
        *self.forced_conflicts.lock() = n;
    }
}

#[async_trait]
impl ShowRepository for InMemoryShows {
    async fn find_by_id(&self, id: ShowId) -> ShowtimeResult<Option<Show>> {
        Ok(self.get(id))
    }

    async fn find_by_ids(&self, ids: &[ShowId]) -> ShowtimeResult<Vec<Show>> {
        let rows = self.rows.lock();
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }

    async fn find_upcoming(&self, from: DateTime<Utc>) -> ShowtimeResult<Vec<Show>> {
        let mut shows: Vec<Show> = self
            .rows
            .lock()
            .values()
            .filter(|s| s.show_date_time >= from)
            .cloned()
            .collect();
        shows.sort_by_key(|s| s.show_date_time);
        Ok(shows)
    }

    async fn find_upcoming_for_movie(
        &self,
        movie_id: &MovieId,
        from: DateTime<Utc>,
    ) -> ShowtimeResult<Vec<Show>> {
        let mut shows = self.find_upcoming(from).await?;
        shows.retain(|s| &s.movie_id == movie_id);
        Ok(shows)
    }

    async fn find_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ShowtimeResult<Vec<Show>> {
        let mut shows = self.find_upcoming(from).await?;
        shows.retain(|s| s.show_date_time < to);
        Ok(shows)
    }

    async fn create_many(&self, shows: &[Show]) -> ShowtimeResult<()> {
        for show in shows {
            self.insert(show.clone());
        }
        Ok(())
    }

    async fn update_seats(&self, show: &Show) -> ShowtimeResult<bool> {
        let mut rows = self.rows.lock();
        let Some(row) = rows.get_mut(&show.id) else {
            return Ok(false);
        };

        let mut forced = self.forced_conflicts.lock();
        if *forced > 0 {
            *forced -= 1;
            row.version += 1;
            return Ok(false);
        }

        if row.version != show.version {
            return Ok(false);
        }
        row.occupied_seats.clone_from(&show.occupied_seats);
        row.version += 1;
        Ok(true)
    }
}

#[derive(Default)]
pub struct InMemoryBookings {
    rows: Mutex<BTreeMap<BookingId, Booking>>,
}

impl InMemoryBookings {
    pub fn insert(&self, booking: Booking) {
        self.rows.lock().insert(booking.id, booking);
    }

    #[must_use]
    pub fn get(&self, id: BookingId) -> Option<Booking> {
        self.rows.lock().get(&id).cloned()
    }

    pub fn remove(&self, id: BookingId) -> Option<Booking> {
        self.rows.lock().remove(&id)
    }

    /// Marks the stored booking paid, as a concurrent confirmation would.
    pub fn pay(&self, id: BookingId) {
        if let Some(booking) = self.rows.lock().get_mut(&id) {
            booking.mark_paid();
        }
    }
}

type BookingHook = Box<dyn FnOnce(&InMemoryBookings) + Send>;

/// In-memory bookings that run a hook right before the next conditional
/// write (`update_payment` or `delete_unpaid`), to interleave a concurrent
/// writer with the code under test.
pub struct InterleavedBookings {
    inner: Arc<InMemoryBookings>,
    hook: Mutex<Option<BookingHook>>,
}

impl InterleavedBookings {
    #[must_use]
    pub fn new(inner: Arc<InMemoryBookings>) -> Self {
        Self {
            inner,
            hook: Mutex::new(None),
        }
    }

    pub fn before_next_write(&self, hook: impl FnOnce(&InMemoryBookings) + Send + 'static) {
        *self.hook.lock() = Some(Box::new(hook));
    }

    fn run_hook(&self) {
        let hook = self.hook.lock().take();
        if let Some(hook) = hook {
            hook(&self.inner);
        }
    }
}

#[async_trait]
impl BookingRepository for InterleavedBookings {
    async fn find_by_id(&self, id: BookingId) -> ShowtimeResult<Option<Booking>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_user(&self, user_id: &UserId) -> ShowtimeResult<Vec<Booking>> {
        self.inner.find_by_user(user_id).await
    }

    async fn create(&self, booking: &Booking) -> ShowtimeResult<Booking> {
        self.inner.create(booking).await
    }

    async fn update_payment(&self, booking: &Booking) -> ShowtimeResult<bool> {
        self.run_hook();
        self.inner.update_payment(booking).await
    }

    async fn delete(&self, id: BookingId) -> ShowtimeResult<bool> {
        self.inner.delete(id).await
    }

    async fn delete_unpaid(&self, id: BookingId) -> ShowtimeResult<bool> {
        self.run_hook();
        self.inner.delete_unpaid(id).await
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookings {
    async fn find_by_id(&self, id: BookingId) -> ShowtimeResult<Option<Booking>> {
        Ok(self.get(id))
    }

    async fn find_by_user(&self, user_id: &UserId) -> ShowtimeResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .rows
            .lock()
            .values()
            .filter(|b| &b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn create(&self, booking: &Booking) -> ShowtimeResult<Booking> {
        self.insert(booking.clone());
        Ok(booking.clone())
    }

    async fn update_payment(&self, booking: &Booking) -> ShowtimeResult<bool> {
        let mut rows = self.rows.lock();
        match rows.get_mut(&booking.id) {
            Some(row) if !row.is_paid => {
                row.is_paid = booking.is_paid;
                row.payment_link.clone_from(&booking.payment_link);
                row.updated_at = booking.updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: BookingId) -> ShowtimeResult<bool> {
        Ok(self.rows.lock().remove(&id).is_some())
    }

    async fn delete_unpaid(&self, id: BookingId) -> ShowtimeResult<bool> {
        let mut rows = self.rows.lock();
        if rows.get(&id).is_some_and(|b| !b.is_paid) {
            rows.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }
}

/// Every repository, backed by memory.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    pub users: Arc<InMemoryUsers>,
    pub movies: Arc<InMemoryMovies>,
    pub shows: Arc<InMemoryShows>,
    pub bookings: Arc<InMemoryBookings>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn repositories(&self) -> Repositories {
        Repositories {
            users: self.users.clone(),
            movies: self.movies.clone(),
            shows: self.shows.clone(),
            bookings: self.bookings.clone(),
        }
    }

    /// Repositories whose bookings interleave a concurrent writer.
    #[must_use]
    pub fn interleaved(&self) -> (Repositories, Arc<InterleavedBookings>) {
        let bookings = Arc::new(InterleavedBookings::new(self.bookings.clone()));
        let repos = Repositories {
            bookings: bookings.clone(),
            ..self.repositories()
        };
        (repos, bookings)
    }
}

/// [`EventBus`] that records what was published.
#[derive(Default)]
pub struct RecordingEventBus {
    events: Mutex<Vec<AppEvent>>,
}

impl RecordingEventBus {
    #[must_use]
    pub fn events(&self) -> Vec<AppEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EventBus for RecordingEventBus {
    async fn publish(&self, event: AppEvent) -> ShowtimeResult<Option<JobId>> {
        self.events.lock().push(event);
        Ok(Some(JobId::new()))
    }
}

/// A movie with just enough data for tests.
#[must_use]
pub fn movie(id: &str, title: &str) -> Movie {
    Movie {
        id: MovieId::new(id),
        title: title.to_string(),
        overview: String::new(),
        poster_path: format!("/{id}.jpg"),
        backdrop_path: format!("/{id}-backdrop.jpg"),
        release_date: chrono::NaiveDate::from_ymd_opt(1999, 10, 15).unwrap_or_default(),
        original_language: Some("en".to_string()),
        tagline: None,
        genres: Vec::new(),
        casts: Vec::new(),
        vote_average: 8.4,
        runtime: 139,
        created_at: Utc::now(),
    }
}

#[must_use]
pub fn user(id: &str, name: &str) -> User {
    User::new(
        UserId::new(id),
        name,
        format!("{}@example.com", id.to_lowercase()),
        "https://img.example.com/a.png",
    )
}
