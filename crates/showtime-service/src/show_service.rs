//! Show listings and scheduling.

use crate::dto::{AddShowsRequest, MovieSchedule, ShowDetails, ShowTime};
use crate::events::EventBus;
use crate::repositories::Repositories;
use crate::validation::ValidateExt;
use chrono::{DateTime, NaiveTime, Utc};
use showtime_core::{AppEvent, Movie, MovieId, Show, ShowAdded, ShowtimeError, ShowtimeResult};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{error, info, instrument};

pub struct ShowService {
    repos: Repositories,
    events: Arc<dyn EventBus>,
}

impl ShowService {
    pub fn new(repos: Repositories, events: Arc<dyn EventBus>) -> Self {
        Self { repos, events }
    }

    /// Shows starting after `now`, earliest first, each with its movie.
    pub async fn upcoming_shows(&self, now: DateTime<Utc>) -> ShowtimeResult<Vec<ShowDetails>> {
        let shows = self.repos.shows.find_upcoming(now).await?;

        let movie_ids: Vec<MovieId> = shows
            .iter()
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

        Ok(shows
            .into_iter()
            .map(|show| ShowDetails {
                movie: movies.get(&show.movie_id).cloned(),
                show,
            })
            .collect())
    }

    /// A movie and its upcoming show times grouped by day.
    pub async fn movie_schedule(
        &self,
        movie_id: &MovieId,
        now: DateTime<Utc>,
    ) -> ShowtimeResult<MovieSchedule> {
        let movie = self
            .repos
            .movies
            .find_by_id(movie_id)
            .await?
            .ok_or_else(|| ShowtimeError::not_found("Movie", movie_id))?;

        let mut date_time: BTreeMap<_, Vec<ShowTime>> = BTreeMap::new();
        for show in self.repos.shows.find_upcoming_for_movie(movie_id, now).await? {
            date_time
                .entry(show.show_date_time.date_naive())
                .or_default()
                .push(ShowTime {
                    time: show.show_date_time,
                    show_id: show.id,
                });
        }

        Ok(MovieSchedule { movie, date_time })
    }

    /// Stores the movie if new, creates one show per date and time, and
    /// announces the movie to every user.
    #[instrument(skip(self, request), fields(movie_id = %request.movie.id))]
    pub async fn add_shows(&self, request: AddShowsRequest) -> ShowtimeResult<Vec<Show>> {
        request.validate_request()?;

        let movie = match self.repos.movies.find_by_id(&request.movie.id).await? {
            Some(existing) => existing,
            None => self.repos.movies.save(&request.movie).await?,
        };

        let mut shows = Vec::new();
        for input in &request.shows_input {
            for time in &input.time {
                let time = NaiveTime::parse_from_str(time, "%H:%M").map_err(|_| {
                    ShowtimeError::validation(format!("Invalid show time '{time}', expected HH:MM"))
                })?;
                let starts_at = input.date.and_time(time).and_utc();
                shows.push(Show::new(movie.id.clone(), starts_at, request.show_price));
            }
        }

        self.repos.shows.create_many(&shows).await?;
        info!(count = shows.len(), "Shows added");

        // The shows exist either way; a lost announcement is not worth failing the request.
        if let Err(e) = self
            .events
            .publish(AppEvent::ShowAdded(ShowAdded {
                movie_title: movie.title.clone(),
            }))
            .await
        {
            error!(error = %e, "Failed to announce new shows");
        }

        Ok(shows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::ShowsInput;
    use crate::testing::{movie, InMemoryStore, RecordingEventBus};
    use chrono::{Duration, NaiveDate};

    fn service(store: &InMemoryStore, events: Arc<RecordingEventBus>) -> ShowService {
        ShowService::new(store.repositories(), events)
    }

    fn add_request(times: &[&str]) -> AddShowsRequest {
        AddShowsRequest {
            movie: movie("550", "Fight Club"),
            shows_input: vec![ShowsInput {
                date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
                time: times.iter().map(ToString::to_string).collect(),
            }],
            show_price: 1200,
        }
    }

    #[tokio::test]
    async fn test_add_shows_stores_movie_and_announces() {
        let store = InMemoryStore::new();
        let events = Arc::new(RecordingEventBus::default());

        let shows = service(&store, events.clone())
            .add_shows(add_request(&["18:00", "21:30"]))
            .await
            .unwrap();

        assert_eq!(shows.len(), 2);
        assert!(store.movies.get(&MovieId::new("550")).is_some());
        assert_eq!(
            shows[1].show_date_time.to_rfc3339(),
            "2030-01-01T21:30:00+00:00"
        );
        assert_eq!(
            events.events(),
            vec![AppEvent::ShowAdded(ShowAdded {
                movie_title: "Fight Club".into()
            })]
        );
    }

    #[tokio::test]
    async fn test_bad_time_is_rejected_before_writing() {
        let store = InMemoryStore::new();
        let events = Arc::new(RecordingEventBus::default());

        let err = service(&store, events.clone())
            .add_shows(add_request(&["18:00", "late"]))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 400);
        assert!(events.events().is_empty());
    }

    #[tokio::test]
    async fn test_schedule_groups_by_day_and_skips_past_shows() {
        let store = InMemoryStore::new();
        store.movies.insert(movie("550", "Fight Club"));
        let now = Utc::now();
        for offset in [-2, 25, 26, 49] {
            store
                .shows
                .insert(Show::new("550".into(), now + Duration::hours(offset), 1200));
        }

        let schedule = service(&store, Arc::new(RecordingEventBus::default()))
            .movie_schedule(&MovieId::new("550"), now)
            .await
            .unwrap();

        let total: usize = schedule.date_time.values().map(Vec::len).sum();
        assert_eq!(total, 3);
        assert_eq!(schedule.movie.title, "Fight Club");
    }

    #[tokio::test]
    async fn test_upcoming_shows_carry_movies() {
        let store = InMemoryStore::new();
        store.movies.insert(movie("550", "Fight Club"));
        store
            .shows
            .insert(Show::new("550".into(), Utc::now() + Duration::hours(3), 1200));

        let shows = service(&store, Arc::new(RecordingEventBus::default()))
            .upcoming_shows(Utc::now())
            .await
            .unwrap();

        assert_eq!(shows.len(), 1);
        assert!(shows[0].movie.is_some());
    }
}
