//! `raw.users`

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub tg_id: i64,
    pub tg_username: Option<String>,
    pub subscription: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a user or refresh the username of an existing one
    pub async fn upsert(&self, tg_id: i64, tg_username: Option<&str>) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO raw.users (tg_id, tg_username)
             VALUES ($1, $2)
             ON CONFLICT (tg_id) DO UPDATE
             SET tg_username = EXCLUDED.tg_username,
                 updated_at = CURRENT_TIMESTAMP
             RETURNING id, tg_id, tg_username, subscription, created_at, updated_at",
        )
        .bind(tg_id)
        .bind(tg_username)
        .fetch_one(self.pool)
        .await?;

        tracing::debug!(user_id = user.id, tg_id, "User upserted");
        Ok(user)
    }
}
