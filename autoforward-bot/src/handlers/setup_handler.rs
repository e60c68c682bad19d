//! Credential wizard: a linear state machine that collects API id, API hash,
//! session string, and the channel pair, one plain-text message at a time.
//!
//! `/setup` arms the wizard; while a state is active this handler consumes
//! non-command messages. Everything collected is stored as-is; talking to the
//! provider's auth endpoints is out of scope here.

use std::sync::Arc;

use async_trait::async_trait;
use forward_core::{Bot, BotError, Handler, HandlerResponse, IncomingMessage, Result};
use storage::{ProfileRepository, SetupState, StorageError};
use tracing::{info, instrument};

pub struct SetupHandler {
    bot: Arc<dyn Bot>,
    profiles: ProfileRepository,
}

impl SetupHandler {
    pub fn new(bot: Arc<dyn Bot>, profiles: ProfileRepository) -> Self {
        Self { bot, profiles }
    }

    async fn reply(&self, message: &IncomingMessage, text: &str) -> Result<HandlerResponse> {
        self.bot.reply_to(message, text).await?;
        Ok(HandlerResponse::Stop)
    }
}

fn db_err(error: StorageError) -> BotError {
    BotError::Database(error.to_string())
}

#[async_trait]
impl Handler for SetupHandler {
    #[instrument(skip(self, message))]
    async fn handle(&self, message: &IncomingMessage) -> Result<HandlerResponse> {
        let user_id = message.user.id;
        let text = message.content.trim();

        if text == "/setup" {
            self.profiles
                .set_setup_state(user_id, Some(SetupState::ApiId))
                .await
                .map_err(db_err)?;
            info!(user_id, "setup wizard started");
            return self
                .reply(message, "Let's get you set up. Please send your API id.")
                .await;
        }
        if text.starts_with('/') {
            return Ok(HandlerResponse::Continue);
        }

        let Some(profile) = self.profiles.load(user_id).await.map_err(db_err)? else {
            return Ok(HandlerResponse::Continue);
        };
        let Some(state) = profile.setup_state else {
            return Ok(HandlerResponse::Continue);
        };

        match state {
            SetupState::ApiId => match text.parse::<i64>() {
                Ok(api_id) => {
                    self.profiles.set_api_id(user_id, api_id).await.map_err(db_err)?;
                    self.profiles
                        .set_setup_state(user_id, Some(SetupState::ApiHash))
                        .await
                        .map_err(db_err)?;
                    self.reply(message, "Got it. Now send your API hash.").await
                }
                Err(_) => {
                    self.reply(
                        message,
                        "That does not look like a numeric API id. Please try again.",
                    )
                    .await
                }
            },
            SetupState::ApiHash => {
                if text.len() == 32 {
                    self.profiles.set_api_hash(user_id, text).await.map_err(db_err)?;
                    self.profiles
                        .set_setup_state(user_id, Some(SetupState::Session))
                        .await
                        .map_err(db_err)?;
                    self.reply(message, "Now send your session string.").await
                } else {
                    self.reply(
                        message,
                        "An API hash is 32 characters long. Please check and resend.",
                    )
                    .await
                }
            }
            SetupState::Session => {
                self.profiles
                    .set_session_string(user_id, text)
                    .await
                    .map_err(db_err)?;
                self.profiles
                    .set_setup_state(user_id, Some(SetupState::Source))
                    .await
                    .map_err(db_err)?;
                self.reply(message, "Send the source channel (id or @username).")
                    .await
            }
            SetupState::Source => {
                self.profiles.set_source(user_id, text).await.map_err(db_err)?;
                self.profiles
                    .set_setup_state(user_id, Some(SetupState::Destination))
                    .await
                    .map_err(db_err)?;
                self.reply(message, "And the destination channel?").await
            }
            SetupState::Destination => {
                self.profiles
                    .set_destination(user_id, text)
                    .await
                    .map_err(db_err)?;
                self.profiles
                    .set_setup_state(user_id, None)
                    .await
                    .map_err(db_err)?;
                info!(user_id, "setup wizard finished");
                self.reply(
                    message,
                    "Setup complete. Use /start_forwarding <start>-<end> to begin.",
                )
                .await
            }
        }
    }
}
