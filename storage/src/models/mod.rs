//! Persistence models: forwarding jobs and user profiles.

mod job;
mod profile;

pub use job::{JobRecord, JobStatus};
pub use profile::{SetupState, UserProfile};
