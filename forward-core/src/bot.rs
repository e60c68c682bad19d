//! Bot abstraction for sending and editing messages.
//!
//! The trait is transport-agnostic; the Telegram implementation lives in the
//! application crate.

use crate::error::Result;
use crate::types::{Chat, IncomingMessage};
use async_trait::async_trait;

/// Abstraction for sending and editing messages. Implementations map to a
/// transport (e.g. Telegram).
#[async_trait]
pub trait Bot: Send + Sync {
    /// Sends a text message to the given chat.
    async fn send_message(&self, chat: &Chat, text: &str) -> Result<()>;
    /// Sends a reply to the given message (same chat).
    async fn reply_to(&self, message: &IncomingMessage, text: &str) -> Result<()>;
    /// Edits an already-sent message. `message_id` is transport-specific
    /// (e.g. Telegram numeric string).
    async fn edit_message(&self, chat: &Chat, message_id: &str, text: &str) -> Result<()>;
    /// Sends a message and returns its id (for later `edit_message`, e.g. a
    /// progress message that is updated in place).
    async fn send_message_and_return_id(&self, chat: &Chat, text: &str) -> Result<String>;
}
