//! Forwarding job model: one row per user in the `jobs` table.
//!
//! The persisted `current_id`/`forwarded_count` pair is the checkpoint the
//! engine resumes from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a forwarding job. Stored as lowercase TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Idle,
    Running,
    Stopping,
    Stopped,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Running => "running",
            JobStatus::Stopping => "stopping",
            JobStatus::Stopped => "stopped",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Terminal states for one engine invocation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Stopped | JobStatus::Completed | JobStatus::Failed
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user's forwarding job: channel pair, id range, cursor, count, status.
///
/// Invariants maintained by the engine: `start_id ≤ current_id ≤ end_id + 1`
/// and `forwarded_count ≤ end_id − start_id + 1`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobRecord {
    pub user_id: i64,
    pub source: String,
    pub destination: String,
    pub start_id: i64,
    pub end_id: i64,
    /// Next unprocessed message id (the cursor).
    pub current_id: i64,
    pub forwarded_count: i64,
    pub status: JobStatus,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Creates a fresh job over `[start_id, end_id]` with the cursor at the
    /// range start. Status starts `Idle`; the command surface flips it to
    /// `Running` when the job is submitted.
    pub fn new(
        user_id: i64,
        source: String,
        destination: String,
        start_id: i64,
        end_id: i64,
    ) -> Self {
        Self {
            user_id,
            source,
            destination,
            start_id,
            end_id,
            current_id: start_id,
            forwarded_count: 0,
            status: JobStatus::Idle,
            updated_at: Utc::now(),
        }
    }

    /// Size of the configured range.
    pub fn total_messages(&self) -> i64 {
        self.end_id - self.start_id + 1
    }
}
