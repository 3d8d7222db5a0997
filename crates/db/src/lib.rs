//! SQLite connection pool factory and migration runner.

use std::str::FromStr;
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Sqlite;

mod error;
mod migrate;

pub use error::{DbError, DbResult};
pub use migrate::{apply_migrations, applied_migrations, Migration};
pub use sqlx;

/// How long a write waits on another connection's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle to the relational store.
///
/// Cloning is cheap; all clones share the same pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a pool against `url`, creating the database file if it does not exist.
    pub async fn connect(url: &str, max_connections: u32) -> DbResult<Self> {
        tracing::info!(target: "shelf-db", %url, max_connections, "connecting to database");

        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        tracing::info!(target: "shelf-db", "connected to database");
        Ok(Self { pool })
    }

    /// Private in-memory database backed by a single connection.
    ///
    /// Every SQLite `:memory:` connection is its own database, so the pool is
    /// capped at one connection that is never recycled.
    pub async fn in_memory() -> DbResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check out a single connection.
    pub async fn acquire(&self) -> DbResult<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
