//! Dedup repository: which message identities and content fingerprints have
//! already been relayed, per user.
//!
//! Marks are write-once-true and idempotent (`INSERT OR IGNORE`). If the
//! process dies between a successful relay and the mark, that one item is
//! relayed again on resume: at-least-once, not exactly-once.

use tracing::{debug, info};

use crate::error::StorageError;
use crate::sqlite_pool::SqlitePoolManager;

#[derive(Clone)]
pub struct DedupRepository {
    pool_manager: SqlitePoolManager,
}

impl DedupRepository {
    pub async fn new(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        let repo = Self { pool_manager };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> Result<(), StorageError> {
        info!("Creating dedup tables if not exist");

        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS forwarded_messages (
                user_id INTEGER NOT NULL,
                message_id INTEGER NOT NULL,
                PRIMARY KEY (user_id, message_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS forwarded_files (
                user_id INTEGER NOT NULL,
                fingerprint TEXT NOT NULL,
                PRIMARY KEY (user_id, fingerprint)
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn is_message_forwarded(
        &self,
        user_id: i64,
        message_id: i64,
    ) -> Result<bool, StorageError> {
        let row: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM forwarded_messages WHERE user_id = ? AND message_id = ?",
        )
        .bind(user_id)
        .bind(message_id)
        .fetch_optional(self.pool_manager.pool())
        .await?;
        Ok(row.is_some())
    }

    pub async fn mark_message_forwarded(
        &self,
        user_id: i64,
        message_id: i64,
    ) -> Result<(), StorageError> {
        sqlx::query("INSERT OR IGNORE INTO forwarded_messages (user_id, message_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(message_id)
            .execute(self.pool_manager.pool())
            .await?;
        debug!(user_id, message_id, "Marked message forwarded");
        Ok(())
    }

    pub async fn is_fingerprint_forwarded(
        &self,
        user_id: i64,
        fingerprint: &str,
    ) -> Result<bool, StorageError> {
        let row: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM forwarded_files WHERE user_id = ? AND fingerprint = ?",
        )
        .bind(user_id)
        .bind(fingerprint)
        .fetch_optional(self.pool_manager.pool())
        .await?;
        Ok(row.is_some())
    }

    pub async fn mark_fingerprint_forwarded(
        &self,
        user_id: i64,
        fingerprint: &str,
    ) -> Result<(), StorageError> {
        sqlx::query("INSERT OR IGNORE INTO forwarded_files (user_id, fingerprint) VALUES (?, ?)")
            .bind(user_id)
            .bind(fingerprint)
            .execute(self.pool_manager.pool())
            .await?;
        debug!(user_id, fingerprint = %fingerprint, "Marked fingerprint forwarded");
        Ok(())
    }
}
