//! Conversions from teloxide types to core types.

use forward_core::{Chat, IncomingMessage, ToCoreMessage, ToCoreUser, User};

pub struct TelegramUserWrapper<'a>(pub &'a teloxide::types::User);

impl<'a> ToCoreUser for TelegramUserWrapper<'a> {
    fn to_core(&self) -> User {
        User {
            id: self.0.id.0 as i64,
            username: self.0.username.clone(),
            first_name: Some(self.0.first_name.clone()),
            last_name: self.0.last_name.clone(),
        }
    }
}

pub struct TelegramMessageWrapper<'a>(pub &'a teloxide::types::Message);

impl<'a> ToCoreMessage for TelegramMessageWrapper<'a> {
    fn to_core(&self) -> IncomingMessage {
        IncomingMessage {
            id: self.0.id.to_string(),
            user: self
                .0
                .from
                .as_ref()
                .map(|user| TelegramUserWrapper(user).to_core())
                .unwrap_or_else(|| User {
                    id: 0,
                    username: None,
                    first_name: None,
                    last_name: None,
                }),
            chat: Chat {
                id: self.0.chat.id.0,
                chat_type: format!("{:?}", self.0.chat.kind),
            },
            content: self.0.text().unwrap_or("").to_string(),
            created_at: chrono::Utc::now(),
        }
    }
}
