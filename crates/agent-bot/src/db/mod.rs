//! Postgres access
//!
//! One pool for the whole process. Tables live in the `raw` schema.

mod user;

use std::str::FromStr;

use sqlx::ConnectOptions;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::error::{BotError, Result};
use crate::settings::DatabaseSettings;

pub use user::{User, UserRepository};

pub const SCHEMA: &str = "raw";

const CREATE_SCHEMA: &str = "CREATE SCHEMA IF NOT EXISTS raw";

const CREATE_USERS: &str = "\
CREATE TABLE IF NOT EXISTS raw.users (
    id SERIAL PRIMARY KEY,
    tg_id BIGINT NOT NULL UNIQUE,
    tg_username VARCHAR(256) NULL,
    subscription SMALLINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

const CREATE_USERS_TG_ID_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS ix_raw_users_tg_id ON raw.users (tg_id)";

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect with the configured pool limits. Sessions run in UTC.
    pub async fn connect(url: &str, settings: &DatabaseSettings) -> Result<Self> {
        let mut options = PgConnectOptions::from_str(url)?.options([("timezone", "UTC")]);
        if !settings.sql_echo {
            options = options.disable_statement_logging();
        }

        let connect = PgPoolOptions::new()
            .max_connections(settings.max_connections())
            .acquire_timeout(settings.pool_timeout)
            .connect_with(options);

        let pool = tokio::time::timeout(settings.connect_timeout, connect)
            .await
            .map_err(|_| BotError::ConnectTimeout(settings.connect_timeout.as_secs()))??;

        tracing::info!(
            max_connections = settings.max_connections(),
            sql_echo = settings.sql_echo,
            "Database pool ready"
        );

        Ok(Self { pool })
    }

    /// Create the schema and tables if missing
    pub async fn init_schema(&self) -> Result<()> {
        for statement in [CREATE_SCHEMA, CREATE_USERS, CREATE_USERS_TG_ID_INDEX] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!(schema = SCHEMA, "Database schema ready");
        Ok(())
    }

    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.pool)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
