//! MySQL user repository implementation.

use crate::{traits::UserRepository, DatabasePool};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use showtime_core::{ShowtimeResult, User, UserId};
use sqlx::{FromRow, MySql, QueryBuilder};
use tracing::debug;

const SELECT_USER: &str = "SELECT id, name, email, image, created_at, updated_at FROM users";

/// MySQL user repository implementation.
#[derive(Clone)]
pub struct MySqlUserRepository {
    pool: DatabasePool,
}

impl MySqlUserRepository {
    /// Creates a new MySQL user repository.
    #[must_use]
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    image: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId::new(row.id),
            name: row.name,
            email: row.email,
            image: row.image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl UserRepository for MySqlUserRepository {
    async fn find_by_id(&self, id: &UserId) -> ShowtimeResult<Option<User>> {
        debug!(user_id = %id, "Finding user by id");

        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(self.pool.inner())
            .await?;

        Ok(row.map(User::from))
    }

    async fn find_all(&self) -> ShowtimeResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} ORDER BY created_at"))
            .fetch_all(self.pool.inner())
            .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> ShowtimeResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<MySql>::new(format!("{SELECT_USER} WHERE id IN ("));
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        let rows = query
            .build_query_as::<UserRow>()
            .fetch_all(self.pool.inner())
            .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn create(&self, user: &User) -> ShowtimeResult<User> {
        debug!(user_id = %user.id, "Creating user");

        sqlx::query(
            r"
            INSERT INTO users (id, name, email, image, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(user.id.as_str())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.image)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(self.pool.inner())
        .await?;

        Ok(user.clone())
    }

    async fn update(&self, user: &User) -> ShowtimeResult<bool> {
        debug!(user_id = %user.id, "Updating user");

        let result = sqlx::query(
            "UPDATE users SET name = ?, email = ?, image = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.image)
        .bind(user.updated_at)
        .bind(user.id.as_str())
        .execute(self.pool.inner())
        .await?;

        // MySQL reports 0 affected rows when nothing changed, so check existence.
        if result.rows_affected() > 0 {
            return Ok(true);
        }
        Ok(self.find_by_id(&user.id).await?.is_some())
    }

    async fn delete(&self, id: &UserId) -> ShowtimeResult<bool> {
        debug!(user_id = %id, "Deleting user");

        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.as_str())
            .execute(self.pool.inner())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
