//! Progress sink that edits the job's status message in place.

use std::sync::Arc;

use async_trait::async_trait;
use forward_core::{Bot, Chat};
use forward_engine::ProgressSink;
use tracing::warn;

/// Edits the progress message the start/resume command sent; notices go out
/// as fresh messages. Delivery failures are logged, never propagated: a
/// broken status message must not kill the job.
pub struct TelegramProgressSink {
    bot: Arc<dyn Bot>,
    chat: Chat,
    message_id: String,
}

impl TelegramProgressSink {
    pub fn new(bot: Arc<dyn Bot>, chat: Chat, message_id: String) -> Self {
        Self {
            bot,
            chat,
            message_id,
        }
    }
}

#[async_trait]
impl ProgressSink for TelegramProgressSink {
    async fn progress(&self, user_id: i64, text: &str) {
        if let Err(e) = self.bot.edit_message(&self.chat, &self.message_id, text).await {
            warn!(user_id, error = %e, "could not update progress message");
        }
    }

    async fn notify(&self, user_id: i64, text: &str) {
        if let Err(e) = self.bot.send_message(&self.chat, text).await {
            warn!(user_id, error = %e, "could not deliver notice");
        }
    }
}
