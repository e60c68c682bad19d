//! Resumable batch-forwarding engine.
//!
//! The engine relays a bounded id range from a source channel to a
//! destination on behalf of many independent users: batched fetches,
//! per-user rate limiting, dedup by message id and content fingerprint,
//! checkpointed progress for resume, and a retry/backoff state machine
//! around each relay.
//!
//! ## Modules
//!
//! - [`rate_limiter`] – per-user sliding-window limiter
//! - [`forwarder`] – the engine loop ([`Forwarder::run`])
//! - [`progress`] – ProgressSink trait + LogSink
//! - [`registry`] – in-flight task registry with cooperative stop
//! - [`scheduler`] – job queue, worker pool, stop/recovery entry points
//! - [`error`] – EngineError and JobOutcome

pub mod error;
pub mod forwarder;
pub mod progress;
pub mod rate_limiter;
pub mod registry;
pub mod scheduler;

pub use error::{EngineError, JobOutcome};
pub use forwarder::{Forwarder, ForwarderConfig};
pub use progress::{LogSink, ProgressSink};
pub use rate_limiter::UserRateLimiter;
pub use registry::{StopOutcome, TaskRegistry};
pub use scheduler::{JobRequest, JobScheduler, STOP_TIMEOUT};
