use sqlx::{
    any::{AnyConnectOptions, AnyPoolOptions},
    AnyPool, ConnectOptions,
};
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;
use log::LevelFilter;

use crate::domain::errors::{StoreError, StoreResult};

pub mod accounts;
pub mod memory;
pub mod password_reset;

pub use memory::InMemoryStore;

pub struct Database {
    pub(crate) pool: AnyPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        Self::connect_with_timeout(database_url, Duration::from_secs(5)).await
    }

    /// Connect with a bounded wait for pool connections, so a saturated pool
    /// surfaces as an error instead of a hang.
    pub async fn connect_with_timeout(
        database_url: &str,
        acquire_timeout: Duration,
    ) -> Result<Self, sqlx::Error> {
        // Ensure drivers are installed for AnyPool
        sqlx::any::install_default_drivers();

        let connect_options = AnyConnectOptions::from_str(database_url)?
            .log_statements(LevelFilter::Info)
            .log_slow_statements(LevelFilter::Warn, Duration::from_secs(1));

        let pool = AnyPoolOptions::new()
            .max_connections(20)
            .min_connections(1)
            .acquire_timeout(acquire_timeout)
            .connect_with(connect_options)
            .await?;

        // Enable optimizations for SQLite
        if database_url.starts_with("sqlite") {
            sqlx::query("PRAGMA journal_mode = WAL")
                .execute(&pool)
                .await?;
            sqlx::query("PRAGMA busy_timeout = 5000")
                .execute(&pool)
                .await?;
            sqlx::query("PRAGMA synchronous = NORMAL")
                .execute(&pool)
                .await?;
            sqlx::query("PRAGMA foreign_keys = ON")
                .execute(&pool)
                .await?;
        }

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("migrations/sqlite").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

/// Timestamps are stored as unix seconds so the store compares them numerically
pub(crate) fn to_unix(value: OffsetDateTime) -> i64 {
    value.unix_timestamp()
}

pub(crate) fn from_unix(value: i64, column: &str) -> StoreResult<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(value)
        .map_err(|e| StoreError::Corrupt(format!("{}: {}", column, e)))
}
