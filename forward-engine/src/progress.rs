//! Progress reporting seam.
//!
//! The engine pushes rendered progress lines and one-off notices here;
//! delivery is best-effort and never fails the job.

use async_trait::async_trait;
use tracing::info;

/// Receiver for job progress. The Telegram implementation edits the user's
/// progress message in place; [`LogSink`] just logs.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// A progress line; called only when the rendered text changed.
    async fn progress(&self, user_id: i64, text: &str);
    /// A one-off notice (skips, gaps, failures).
    async fn notify(&self, user_id: i64, text: &str);
}

/// Sink for jobs with no chat to report into (e.g. restart recovery).
pub struct LogSink;

#[async_trait]
impl ProgressSink for LogSink {
    async fn progress(&self, user_id: i64, text: &str) {
        info!(user_id, "{}", text);
    }

    async fn notify(&self, user_id: i64, text: &str) {
        info!(user_id, "{}", text);
    }
}
