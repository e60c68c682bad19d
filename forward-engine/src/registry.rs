//! Registry of in-flight forwarding tasks, one per user.
//!
//! Owns the join handles so a stop request can wait for cooperative exit and
//! fall back to aborting the task.

use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// How a stop request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The task observed the stop flag and exited on its own.
    Cooperative,
    /// The task did not exit within the timeout and was aborted.
    Forced,
    /// No task was registered for the user.
    NotRunning,
}

/// Tracks the single in-flight task per user.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: DashMap<i64, JoinHandle<()>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user's task handle, replacing any finished leftover.
    pub fn register(&self, user_id: i64, handle: JoinHandle<()>) {
        if let Some(previous) = self.tasks.insert(user_id, handle) {
            if !previous.is_finished() {
                warn!(user_id, "replaced a live task handle; aborting the old task");
                previous.abort();
            }
        }
    }

    /// Drops a user's entry if its task has finished.
    pub fn unregister_finished(&self, user_id: i64) {
        self.tasks.remove_if(&user_id, |_, handle| handle.is_finished());
    }

    pub fn is_running(&self, user_id: i64) -> bool {
        self.tasks
            .get(&user_id)
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Number of live tasks.
    pub fn active_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|entry| !entry.value().is_finished())
            .count()
    }

    /// Takes the user's task out of the registry and waits up to `timeout`
    /// for it to exit; aborts it on expiry.
    pub async fn stop(&self, user_id: i64, timeout: Duration) -> StopOutcome {
        let Some((_, mut handle)) = self.tasks.remove(&user_id) else {
            return StopOutcome::NotRunning;
        };
        if handle.is_finished() {
            return StopOutcome::NotRunning;
        }

        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(_) => {
                info!(user_id, "task exited cooperatively after stop request");
                StopOutcome::Cooperative
            }
            Err(_) => {
                warn!(user_id, "task ignored stop request, aborting");
                handle.abort();
                StopOutcome::Forced
            }
        }
    }
}
