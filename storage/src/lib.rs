//! Storage crate: job checkpoints, dedup records, and user profiles.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – JobRecord, JobStatus, UserProfile, SetupState
//! - [`job_repo`] – JobRepository (progress store, SQLite)
//! - [`dedup_repo`] – DedupRepository (forwarded ids / fingerprints)
//! - [`profile_repo`] – ProfileRepository (credentials and wizard state)
//! - [`sqlite_pool`] – SqlitePoolManager

mod dedup_repo;
mod error;
mod job_repo;
mod models;
mod profile_repo;
mod sqlite_pool;

#[cfg(test)]
mod profile_repo_test;

pub use dedup_repo::DedupRepository;
pub use error::StorageError;
pub use job_repo::JobRepository;
pub use models::{JobRecord, JobStatus, SetupState, UserProfile};
pub use profile_repo::ProfileRepository;
pub use sqlite_pool::SqlitePoolManager;
