//! Job repository: the progress store for forwarding jobs.
//!
//! One row per user. `update_progress` writes cursor and count in a single
//! statement so a reader never observes one advanced without the other.

use chrono::Utc;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::models::{JobRecord, JobStatus};
use crate::sqlite_pool::SqlitePoolManager;

#[derive(Clone)]
pub struct JobRepository {
    pool_manager: SqlitePoolManager,
}

impl JobRepository {
    pub async fn new(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        let repo = Self { pool_manager };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> Result<(), StorageError> {
        info!("Creating jobs table if not exists");

        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                user_id INTEGER PRIMARY KEY,
                source TEXT NOT NULL,
                destination TEXT NOT NULL,
                start_id INTEGER NOT NULL,
                end_id INTEGER NOT NULL,
                current_id INTEGER NOT NULL,
                forwarded_count INTEGER NOT NULL,
                status TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Loads a user's job, if one has ever been configured.
    pub async fn load(&self, user_id: i64) -> Result<Option<JobRecord>, StorageError> {
        let job = sqlx::query_as::<_, JobRecord>("SELECT * FROM jobs WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(self.pool_manager.pool())
            .await?;
        Ok(job)
    }

    /// Inserts or fully replaces a user's job row.
    pub async fn upsert(&self, job: &JobRecord) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO jobs (user_id, source, destination, start_id, end_id,
                              current_id, forwarded_count, status, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                source = excluded.source,
                destination = excluded.destination,
                start_id = excluded.start_id,
                end_id = excluded.end_id,
                current_id = excluded.current_id,
                forwarded_count = excluded.forwarded_count,
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(job.user_id)
        .bind(&job.source)
        .bind(&job.destination)
        .bind(job.start_id)
        .bind(job.end_id)
        .bind(job.current_id)
        .bind(job.forwarded_count)
        .bind(job.status)
        .bind(job.updated_at)
        .execute(self.pool_manager.pool())
        .await?;

        debug!(user_id = job.user_id, status = %job.status, "Saved job");
        Ok(())
    }

    /// Writes the checkpoint: count and cursor together, atomically.
    pub async fn update_progress(
        &self,
        user_id: i64,
        forwarded_count: i64,
        current_id: i64,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            "UPDATE jobs SET forwarded_count = ?, current_id = ?, updated_at = ? WHERE user_id = ?",
        )
        .bind(forwarded_count)
        .bind(current_id)
        .bind(Utc::now())
        .bind(user_id)
        .execute(self.pool_manager.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!(
                "no job for user {}",
                user_id
            )));
        }

        debug!(user_id, forwarded_count, current_id, "Checkpoint written");
        Ok(())
    }

    /// Sets the job status unconditionally.
    pub async fn set_status(&self, user_id: i64, status: JobStatus) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE jobs SET status = ?, updated_at = ? WHERE user_id = ?")
            .bind(status)
            .bind(Utc::now())
            .bind(user_id)
            .execute(self.pool_manager.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!(
                "no job for user {}",
                user_id
            )));
        }
        Ok(())
    }

    /// Guarded transition: moves `from` to `to` and reports whether the row
    /// was in `from`. A concurrent writer that got there first wins.
    pub async fn set_status_if(
        &self,
        user_id: i64,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "UPDATE jobs SET status = ?, updated_at = ? WHERE user_id = ? AND status = ?",
        )
        .bind(to)
        .bind(Utc::now())
        .bind(user_id)
        .bind(from)
        .execute(self.pool_manager.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Users whose job was `Running` when the process last stopped; used for
    /// restart-time recovery.
    pub async fn list_running(&self) -> Result<Vec<i64>, StorageError> {
        let users: Vec<i64> = sqlx::query_scalar("SELECT user_id FROM jobs WHERE status = ?")
            .bind(JobStatus::Running)
            .fetch_all(self.pool_manager.pool())
            .await?;
        Ok(users)
    }

    /// Settles jobs left `Stopping` by a crash: the stop already happened, so
    /// mark them `Stopped`. Returns how many rows were settled.
    pub async fn settle_stopping(&self) -> Result<u64, StorageError> {
        let result = sqlx::query("UPDATE jobs SET status = ?, updated_at = ? WHERE status = ?")
            .bind(JobStatus::Stopped)
            .bind(Utc::now())
            .bind(JobStatus::Stopping)
            .execute(self.pool_manager.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
