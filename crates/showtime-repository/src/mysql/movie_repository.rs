//! MySQL movie repository implementation.

use crate::{traits::MovieRepository, DatabasePool};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use showtime_core::{CastMember, Genre, Movie, MovieId, ShowtimeResult};
use sqlx::types::Json;
use sqlx::{FromRow, MySql, QueryBuilder};
use tracing::debug;

const SELECT_MOVIE: &str = "SELECT id, title, overview, poster_path, backdrop_path, release_date, \
     original_language, tagline, genres, casts, vote_average, runtime, created_at FROM movies";

/// MySQL movie repository implementation.
#[derive(Clone)]
pub struct MySqlMovieRepository {
    pool: DatabasePool,
}

impl MySqlMovieRepository {
    /// Creates a new MySQL movie repository.
    #[must_use]
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct MovieRow {
    id: String,
    title: String,
    overview: String,
    poster_path: String,
    backdrop_path: String,
    release_date: NaiveDate,
    original_language: Option<String>,
    tagline: Option<String>,
    genres: Json<Vec<Genre>>,
    casts: Json<Vec<CastMember>>,
    vote_average: f64,
    runtime: u32,
    created_at: DateTime<Utc>,
}

impl From<MovieRow> for Movie {
    fn from(row: MovieRow) -> Self {
        Movie {
            id: MovieId::new(row.id),
            title: row.title,
            overview: row.overview,
            poster_path: row.poster_path,
            backdrop_path: row.backdrop_path,
            release_date: row.release_date,
            original_language: row.original_language,
            tagline: row.tagline,
            genres: row.genres.0,
            casts: row.casts.0,
            vote_average: row.vote_average,
            runtime: row.runtime,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl MovieRepository for MySqlMovieRepository {
    async fn find_by_id(&self, id: &MovieId) -> ShowtimeResult<Option<Movie>> {
        debug!(movie_id = %id, "Finding movie by id");

        let row = sqlx::query_as::<_, MovieRow>(&format!("{SELECT_MOVIE} WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(self.pool.inner())
            .await?;

        Ok(row.map(Movie::from))
    }

    async fn find_by_ids(&self, ids: &[MovieId]) -> ShowtimeResult<Vec<Movie>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<MySql>::new(format!("{SELECT_MOVIE} WHERE id IN ("));
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        let rows = query
            .build_query_as::<MovieRow>()
            .fetch_all(self.pool.inner())
            .await?;

        Ok(rows.into_iter().map(Movie::from).collect())
    }

    async fn save(&self, movie: &Movie) -> ShowtimeResult<Movie> {
        debug!(movie_id = %movie.id, title = %movie.title, "Saving movie");

        sqlx::query(
            r"
            INSERT INTO movies (id, title, overview, poster_path, backdrop_path, release_date,
                                original_language, tagline, genres, casts, vote_average,
                                runtime, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                title = VALUES(title), overview = VALUES(overview),
                poster_path = VALUES(poster_path), backdrop_path = VALUES(backdrop_path),
                release_date = VALUES(release_date), original_language = VALUES(original_language),
                tagline = VALUES(tagline), genres = VALUES(genres), casts = VALUES(casts),
                vote_average = VALUES(vote_average), runtime = VALUES(runtime)
            ",
        )
        .bind(movie.id.as_str())
        .bind(&movie.title)
        .bind(&movie.overview)
        .bind(&movie.poster_path)
        .bind(&movie.backdrop_path)
        .bind(movie.release_date)
        .bind(&movie.original_language)
        .bind(&movie.tagline)
        .bind(Json(&movie.genres))
        .bind(Json(&movie.casts))
        .bind(movie.vote_average)
        .bind(movie.runtime)
        .bind(movie.created_at)
        .execute(self.pool.inner())
        .await?;

        Ok(movie.clone())
    }
}
