//! Job queue and scheduler: accepts start/resume requests over a channel and
//! dispatches them to the engine through a worker pool.
//!
//! Workers serialize per user through the task registry; there is at most one
//! running task per user at any time. Stop requests flip the persisted status
//! first, then cancel the in-memory task with a bounded timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use storage::{JobRepository, JobStatus, StorageError};

use crate::error::EngineError;
use crate::forwarder::Forwarder;
use crate::progress::{LogSink, ProgressSink};
use crate::registry::{StopOutcome, TaskRegistry};

/// How long a stop request waits for cooperative exit before aborting.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// A start/resume request: the user whose persisted job should run, and
/// where progress reports go.
pub struct JobRequest {
    pub user_id: i64,
    pub sink: Arc<dyn ProgressSink>,
}

/// Owns the request channel, the worker pool, and the task registry.
pub struct JobScheduler {
    tx: mpsc::UnboundedSender<JobRequest>,
    registry: Arc<TaskRegistry>,
    jobs: JobRepository,
}

impl JobScheduler {
    /// Spawns `worker_count` workers consuming the request queue.
    pub fn new(
        forwarder: Arc<Forwarder>,
        jobs: JobRepository,
        registry: Arc<TaskRegistry>,
        worker_count: usize,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<JobRequest>();
        let rx = Arc::new(Mutex::new(rx));

        for worker_id in 0..worker_count.max(1) {
            tokio::spawn(worker_loop(
                worker_id,
                rx.clone(),
                forwarder.clone(),
                registry.clone(),
            ));
        }

        Self { tx, registry, jobs }
    }

    /// Enqueues a start/resume request. The caller must already have
    /// persisted the job with status `Running`.
    pub fn submit(&self, request: JobRequest) -> Result<(), EngineError> {
        self.tx
            .send(request)
            .map_err(|_| EngineError::Scheduler("worker pool is shut down".to_string()))
    }

    /// True when an engine task for the user is currently live.
    pub fn is_running(&self, user_id: i64) -> bool {
        self.registry.is_running(user_id)
    }

    /// Requests a stop: persists `Stopping` so the engine exits at the next
    /// batch boundary, then waits up to [`STOP_TIMEOUT`] before aborting.
    pub async fn request_stop(&self, user_id: i64) -> Result<StopOutcome, StorageError> {
        let was_running = self
            .jobs
            .set_status_if(user_id, JobStatus::Running, JobStatus::Stopping)
            .await?;

        let outcome = self.registry.stop(user_id, STOP_TIMEOUT).await;
        match outcome {
            StopOutcome::Cooperative => {
                // The engine persisted its own terminal status on the way out.
            }
            StopOutcome::Forced => {
                warn!(user_id, "force-stopped forwarding task");
                self.jobs.set_status(user_id, JobStatus::Stopped).await?;
            }
            StopOutcome::NotRunning => {
                if was_running {
                    // Flag was set but no task existed (e.g. it died earlier);
                    // settle the row so status does not stick at Stopping.
                    self.jobs
                        .set_status_if(user_id, JobStatus::Stopping, JobStatus::Stopped)
                        .await?;
                }
            }
        }

        info!(user_id, outcome = ?outcome, "stop request handled");
        Ok(outcome)
    }

    /// Restart-time recovery: settles jobs interrupted while stopping, then
    /// resubmits every job that was `Running` when the process last stopped.
    /// Returns how many jobs were resubmitted.
    pub async fn recover(&self) -> Result<usize, StorageError> {
        let settled = self.jobs.settle_stopping().await?;
        if settled > 0 {
            info!(settled, "settled jobs interrupted while stopping");
        }

        let users = self.jobs.list_running().await?;
        for user_id in &users {
            info!(user_id, "resuming interrupted forwarding job");
            if self
                .submit(JobRequest {
                    user_id: *user_id,
                    sink: Arc::new(LogSink),
                })
                .is_err()
            {
                error!(user_id, "could not resubmit interrupted job");
            }
        }
        Ok(users.len())
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<JobRequest>>>,
    forwarder: Arc<Forwarder>,
    registry: Arc<TaskRegistry>,
) {
    loop {
        let request = {
            let mut guard = rx.lock().await;
            guard.recv().await
        };
        let Some(JobRequest { user_id, sink }) = request else {
            break;
        };

        if registry.is_running(user_id) {
            warn!(worker_id, user_id, "job already running, ignoring duplicate request");
            continue;
        }

        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
        let engine = forwarder.clone();
        let handle = tokio::spawn(async move {
            match engine.run(user_id, sink).await {
                Ok(outcome) => info!(user_id, outcome = ?outcome, "forwarding task finished"),
                Err(e) => error!(user_id, error = %e, "forwarding task failed"),
            }
            let _ = done_tx.send(());
        });
        registry.register(user_id, handle);

        // Resolves on normal exit (send) and on abort (sender dropped).
        let _ = done_rx.await;
        registry.unregister_finished(user_id);
    }
}
