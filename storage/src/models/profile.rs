//! User profile model: provider credentials, channel pair, and the setup
//! wizard position.

use serde::{Deserialize, Serialize};

/// Where the setup wizard is for a user; `None` when no wizard is active.
/// Stored as snake_case TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SetupState {
    ApiId,
    ApiHash,
    Session,
    Source,
    Destination,
}

/// Per-user credentials and channel configuration, collected by commands or
/// the wizard. All fields except `user_id` are optional until set.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub user_id: i64,
    pub api_id: Option<i64>,
    pub api_hash: Option<String>,
    pub session_string: Option<String>,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub setup_state: Option<SetupState>,
}

impl UserProfile {
    pub fn empty(user_id: i64) -> Self {
        Self {
            user_id,
            api_id: None,
            api_hash: None,
            session_string: None,
            source: None,
            destination: None,
            setup_state: None,
        }
    }

    /// Human-readable names of the fields a forwarding run still needs.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_id.is_none() {
            missing.push("API id");
        }
        if self.api_hash.is_none() {
            missing.push("API hash");
        }
        if self.source.is_none() {
            missing.push("source channel");
        }
        if self.destination.is_none() {
            missing.push("destination channel");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}
