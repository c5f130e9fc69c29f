//! MySQL show repository implementation.

use super::parse_uuid;
use crate::{traits::ShowRepository, DatabasePool};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use showtime_core::{MovieId, OccupiedSeats, Show, ShowId, ShowtimeError, ShowtimeResult};
use sqlx::types::Json;
use sqlx::{FromRow, MySql, QueryBuilder};
use tracing::debug;

const SELECT_SHOW: &str = "SELECT id, movie_id, show_date_time, show_price, occupied_seats, \
     version, created_at FROM shows";

/// MySQL show repository implementation.
#[derive(Clone)]
pub struct MySqlShowRepository {
    pool: DatabasePool,
}

impl MySqlShowRepository {
    /// Creates a new MySQL show repository.
    #[must_use]
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, sql: &str, from: DateTime<Utc>) -> ShowtimeResult<Vec<Show>> {
        let rows = sqlx::query_as::<_, ShowRow>(sql)
            .bind(from)
            .fetch_all(self.pool.inner())
            .await?;

        rows.into_iter().map(Show::try_from).collect()
    }
}

#[derive(Debug, FromRow)]
struct ShowRow {
    id: String,
    movie_id: String,
    show_date_time: DateTime<Utc>,
    show_price: i64,
    occupied_seats: Json<OccupiedSeats>,
    version: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<ShowRow> for Show {
    type Error = ShowtimeError;

    fn try_from(row: ShowRow) -> Result<Self, Self::Error> {
        Ok(Show {
            id: ShowId::from(parse_uuid("shows.id", &row.id)?),
            movie_id: MovieId::new(row.movie_id),
            show_date_time: row.show_date_time,
            show_price: row.show_price,
            occupied_seats: row.occupied_seats.0,
            version: row.version,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl ShowRepository for MySqlShowRepository {
    async fn find_by_id(&self, id: ShowId) -> ShowtimeResult<Option<Show>> {
        debug!(show_id = %id, "Finding show by id");

        let row = sqlx::query_as::<_, ShowRow>(&format!("{SELECT_SHOW} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(self.pool.inner())
            .await?;

        row.map(Show::try_from).transpose()
    }

    async fn find_by_ids(&self, ids: &[ShowId]) -> ShowtimeResult<Vec<Show>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<MySql>::new(format!("{SELECT_SHOW} WHERE id IN ("));
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id.to_string());
        }
        separated.push_unseparated(")");

        let rows = query
            .build_query_as::<ShowRow>()
            .fetch_all(self.pool.inner())
            .await?;

        rows.into_iter().map(Show::try_from).collect()
    }

    async fn find_upcoming(&self, from: DateTime<Utc>) -> ShowtimeResult<Vec<Show>> {
        self.fetch(
            &format!("{SELECT_SHOW} WHERE show_date_time >= ? ORDER BY show_date_time"),
            from,
        )
        .await
    }

    async fn find_upcoming_for_movie(
        &self,
        movie_id: &MovieId,
        from: DateTime<Utc>,
    ) -> ShowtimeResult<Vec<Show>> {
        let rows = sqlx::query_as::<_, ShowRow>(&format!(
            "{SELECT_SHOW} WHERE movie_id = ? AND show_date_time >= ? ORDER BY show_date_time"
        ))
        .bind(movie_id.as_str())
        .bind(from)
        .fetch_all(self.pool.inner())
        .await?;

        rows.into_iter().map(Show::try_from).collect()
    }

    async fn find_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ShowtimeResult<Vec<Show>> {
        debug!(%from, %to, "Finding shows in window");

        let rows = sqlx::query_as::<_, ShowRow>(&format!(
            "{SELECT_SHOW} WHERE show_date_time >= ? AND show_date_time < ? ORDER BY show_date_time"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(self.pool.inner())
        .await?;

        rows.into_iter().map(Show::try_from).collect()
    }

    async fn create_many(&self, shows: &[Show]) -> ShowtimeResult<()> {
        if shows.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::<MySql>::new(
            "INSERT INTO shows (id, movie_id, show_date_time, show_price, occupied_seats, version, created_at) ",
        );
        query.push_values(shows, |mut row, show| {
            row.push_bind(show.id.to_string())
                .push_bind(show.movie_id.as_str())
                .push_bind(show.show_date_time)
                .push_bind(show.show_price)
                .push_bind(Json(&show.occupied_seats))
                .push_bind(show.version)
                .push_bind(show.created_at);
        });

        query.build().execute(self.pool.inner()).await?;
        debug!(count = shows.len(), "Created shows");
        Ok(())
    }

    async fn update_seats(&self, show: &Show) -> ShowtimeResult<bool> {
        let result = sqlx::query(
            "UPDATE shows SET occupied_seats = ?, version = version + 1 WHERE id = ? AND version = ?",
        )
        .bind(Json(&show.occupied_seats))
        .bind(show.id.to_string())
        .bind(show.version)
        .execute(self.pool.inner())
        .await?;

        let written = result.rows_affected() == 1;
        debug!(show_id = %show.id, version = show.version, written, "Updated occupied seats");
        Ok(written)
    }
}
