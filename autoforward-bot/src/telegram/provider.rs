//! MessageProvider over the Telegram Bot API.
//!
//! Relays use `copy_message` (forward without author attribution). The Bot
//! API cannot fetch arbitrary channel history, so `get_messages` yields
//! id-bearing references and existence is established at relay time, where a
//! missing id surfaces as `InvalidId` and is skipped by the engine.

use async_trait::async_trait;
use forward_core::{ChannelHandle, MessageProvider, ProviderError, SentRef, SourceMessage};
use teloxide::{
    prelude::*,
    types::{MessageId, Recipient},
    ApiError, RequestError,
};
use tracing::debug;

/// Telegram text message size limit; longer sends are truncated like the
/// upstream behavior for oversized copies.
const MAX_TEXT_LEN: usize = 4096;

pub struct TelegramProvider {
    bot: teloxide::Bot,
}

impl TelegramProvider {
    pub fn new(bot: teloxide::Bot) -> Self {
        Self { bot }
    }
}

fn recipient(handle: &ChannelHandle) -> Recipient {
    match handle {
        ChannelHandle::Id(id) => Recipient::Id(ChatId(*id)),
        ChannelHandle::Username(name) => Recipient::ChannelUsername(name.clone()),
    }
}

/// Parses a stored channel reference: numeric id (including `-100…` channel
/// ids) or `@username`.
fn parse_channel_ref(reference: &str) -> Result<ChannelHandle, ProviderError> {
    let reference = reference.trim();
    if let Ok(id) = reference.parse::<i64>() {
        return Ok(ChannelHandle::Id(id));
    }
    if let Some(name) = reference.strip_prefix('@') {
        if !name.is_empty() {
            return Ok(ChannelHandle::Username(format!("@{}", name)));
        }
    }
    Err(ProviderError::NotFound(format!(
        "unrecognized channel reference: {}",
        reference
    )))
}

/// Maps teloxide errors onto the engine's provider taxonomy.
fn classify_error(error: RequestError, message_id: i64) -> ProviderError {
    match error {
        RequestError::RetryAfter(seconds) => {
            ProviderError::RateLimited(seconds.seconds() as u64)
        }
        RequestError::Api(api) => {
            let text = api.to_string();
            match api {
                ApiError::MessageIdInvalid | ApiError::MessageToForwardNotFound => {
                    ProviderError::InvalidId(message_id)
                }
                ApiError::NotEnoughRightsToPostMessages | ApiError::BotBlocked => {
                    ProviderError::WriteForbidden(text)
                }
                ApiError::ChatNotFound => ProviderError::NotFound(text),
                _ if text.contains("CHAT_WRITE_FORBIDDEN")
                    || text.contains("have no rights")
                    || text.contains("not enough rights") =>
                {
                    ProviderError::WriteForbidden(text)
                }
                _ if text.contains("MESSAGE_TOO_LONG") || text.contains("message is too long") => {
                    ProviderError::TooLong
                }
                _ if text.contains("message to copy not found") => {
                    ProviderError::InvalidId(message_id)
                }
                _ => ProviderError::Other(text),
            }
        }
        other => ProviderError::Other(other.to_string()),
    }
}

#[async_trait]
impl MessageProvider for TelegramProvider {
    async fn resolve_channel(&self, reference: &str) -> Result<ChannelHandle, ProviderError> {
        let handle = parse_channel_ref(reference)?;
        if let Err(e) = self.bot.get_chat(recipient(&handle)).await {
            return Err(classify_error(e, 0));
        }
        debug!(channel = %handle, "resolved channel");
        Ok(handle)
    }

    async fn get_messages(
        &self,
        _channel: &ChannelHandle,
        ids: &[i64],
    ) -> Result<Vec<Option<SourceMessage>>, ProviderError> {
        // Copy-at-relay model: hand back references and let `forward` find
        // out which ids actually exist.
        Ok(ids
            .iter()
            .map(|id| Some(SourceMessage::reference(*id)))
            .collect())
    }

    async fn forward(
        &self,
        source: &ChannelHandle,
        destination: &ChannelHandle,
        ids: &[i64],
    ) -> Result<Vec<SentRef>, ProviderError> {
        let mut sent = Vec::with_capacity(ids.len());
        for id in ids {
            let message_id =
                i32::try_from(*id).map_err(|_| ProviderError::InvalidId(*id))?;
            match self
                .bot
                .copy_message(recipient(destination), recipient(source), MessageId(message_id))
                .await
            {
                Ok(copied) => sent.push(SentRef {
                    message_id: copied.0 as i64,
                }),
                Err(e) => return Err(classify_error(e, *id)),
            }
        }
        Ok(sent)
    }

    async fn send_text(
        &self,
        channel: &ChannelHandle,
        text: &str,
    ) -> Result<SentRef, ProviderError> {
        let text: String = if text.chars().count() > MAX_TEXT_LEN {
            text.chars().take(MAX_TEXT_LEN).collect()
        } else {
            text.to_string()
        };
        let message = self
            .bot
            .send_message(recipient(channel), text)
            .await
            .map_err(|e| classify_error(e, 0))?;
        Ok(SentRef {
            message_id: message.id.0 as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_channel_ref() {
        assert_eq!(
            parse_channel_ref("-1001234567890").unwrap(),
            ChannelHandle::Id(-1001234567890)
        );
        assert_eq!(parse_channel_ref(" 42 ").unwrap(), ChannelHandle::Id(42));
    }

    #[test]
    fn test_parse_username_channel_ref() {
        assert_eq!(
            parse_channel_ref("@mychannel").unwrap(),
            ChannelHandle::Username("@mychannel".to_string())
        );
    }

    #[test]
    fn test_parse_bad_channel_ref() {
        assert!(parse_channel_ref("").is_err());
        assert!(parse_channel_ref("@").is_err());
        assert!(parse_channel_ref("no-at-sign").is_err());
    }
}
