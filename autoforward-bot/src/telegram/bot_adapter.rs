//! Wraps teloxide::Bot and implements the core [`Bot`] trait. Production
//! code sends messages via Telegram; tests substitute another Bot impl.

use async_trait::async_trait;
use forward_core::{Bot, BotError, Chat, IncomingMessage, Result};
use teloxide::{prelude::*, types::MessageId};

/// Thin wrapper around teloxide::Bot that implements core's Bot trait.
pub struct TelegramBotAdapter {
    bot: teloxide::Bot,
}

impl TelegramBotAdapter {
    /// Creates an adapter from an existing teloxide Bot.
    pub fn new(bot: teloxide::Bot) -> Self {
        Self { bot }
    }

    /// Returns the underlying teloxide::Bot for direct API use when needed.
    pub fn inner(&self) -> &teloxide::Bot {
        &self.bot
    }
}

/// Parses a message id string into an i32. Used by edit_message.
pub fn parse_message_id(s: &str) -> Result<i32> {
    s.parse()
        .map_err(|_| BotError::Transport(format!("Invalid message_id for edit: {}", s)))
}

#[async_trait]
impl Bot for TelegramBotAdapter {
    async fn send_message(&self, chat: &Chat, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat.id), text.to_string())
            .await
            .map_err(|e| BotError::Transport(e.to_string()))?;
        Ok(())
    }

    async fn reply_to(&self, message: &IncomingMessage, text: &str) -> Result<()> {
        self.send_message(&message.chat, text).await
    }

    async fn edit_message(&self, chat: &Chat, message_id: &str, text: &str) -> Result<()> {
        let id = parse_message_id(message_id)?;
        self.bot
            .edit_message_text(ChatId(chat.id), MessageId(id), text)
            .await
            .map_err(|e| BotError::Transport(e.to_string()))?;
        Ok(())
    }

    async fn send_message_and_return_id(&self, chat: &Chat, text: &str) -> Result<String> {
        let sent = self
            .bot
            .send_message(ChatId(chat.id), text.to_string())
            .await
            .map_err(|e| BotError::Transport(e.to_string()))?;
        Ok(sent.id.to_string())
    }
}
