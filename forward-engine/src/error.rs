//! Engine error taxonomy and job outcomes.
//!
//! Only job-fatal conditions cross the engine boundary; per-message
//! transients are absorbed inside the loop.

use thiserror::Error;

/// Fatal conditions that end a forwarding run.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Missing job/credentials or unresolvable channels; the loop never starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// The destination refused writes; the whole job is aborted.
    #[error("destination write forbidden: {0}")]
    WriteForbidden(String),

    /// Unrecoverable provider failure outside the per-message retry ladder.
    #[error("provider error: {0}")]
    Provider(String),

    /// Checkpoint writes kept failing after backoff.
    #[error("persistence error: {0}")]
    Persistence(#[from] storage::StorageError),

    /// The scheduler's worker pool is gone.
    #[error("scheduler unavailable: {0}")]
    Scheduler(String),
}

/// How a forwarding run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The cursor passed the end of the range.
    Completed,
    /// A stop request was observed at a batch boundary.
    Stopped,
}
