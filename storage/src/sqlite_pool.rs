//! SQLite connection pool wrapper for the storage crate.

use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
    SqlitePool,
};
use tracing::info;

use crate::error::StorageError;

/// Manages a single SQLite pool; creates the DB file if missing.
#[derive(Clone)]
pub struct SqlitePoolManager {
    pool: SqlitePool,
}

impl SqlitePoolManager {
    /// Creates a pool for the given database URL (`sqlite:` URL, file path,
    /// or `sqlite::memory:`).
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        info!(database_url = %database_url, "Initializing SQLite pool");

        let mut options = if database_url.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(database_url)?
        } else {
            SqliteConnectOptions::new().filename(database_url)
        }
        .create_if_missing(true);

        // WAL only applies to file-backed databases.
        if !database_url.contains(":memory:") {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = SqlitePool::connect_with(options).await?;

        Ok(Self { pool })
    }

    /// Returns the underlying pool for running queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
