//! Core types: user, chat, incoming message, and the channel/message models
//! seen by the forwarding engine.

use serde::{Deserialize, Serialize};
use std::fmt;

use chrono::{DateTime, Utc};

/// User identity (id, username, names).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Chat (channel or private) identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub chat_type: String,
}

/// A single incoming message with user, chat, and text content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: String,
    pub user: User,
    pub chat: Chat,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A resolved channel: numeric id (e.g. `-100…`) or public username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelHandle {
    Id(i64),
    Username(String),
}

impl fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelHandle::Id(id) => write!(f, "{}", id),
            ChannelHandle::Username(name) => write!(f, "{}", name),
        }
    }
}

/// Kind of a source message, as far as the provider can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Text,
    Media,
    /// Join/pin/title-change notices; never relayed.
    Service,
    /// Provider could not determine the kind up front.
    Unknown,
}

/// One message position in the source channel, as returned by
/// [`MessageProvider::get_messages`](crate::provider::MessageProvider::get_messages).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMessage {
    pub id: i64,
    pub kind: MessageKind,
    /// Content-derived identity (e.g. attached file hash), when the provider
    /// can compute one; used to catch the same payload under a new id.
    pub fingerprint: Option<String>,
    pub text: Option<String>,
}

impl SourceMessage {
    /// A plain reference carrying only the id; kind and content are resolved
    /// later, at relay time.
    pub fn reference(id: i64) -> Self {
        Self {
            id,
            kind: MessageKind::Unknown,
            fingerprint: None,
            text: None,
        }
    }
}

/// Identity of a message the provider has sent on our behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentRef {
    pub message_id: i64,
}

/// Converts a transport-specific user type to core [`User`].
pub trait ToCoreUser: Send + Sync {
    fn to_core(&self) -> User;
}

/// Converts a transport-specific message type to core [`IncomingMessage`].
pub trait ToCoreMessage: Send + Sync {
    fn to_core(&self) -> IncomingMessage;
}

/// Handler result for the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResponse {
    /// Pass to next handler.
    Continue,
    /// Stop the chain; no response body.
    Stop,
    /// Skip this handler, try next.
    Ignore,
    /// Stop the chain and attach reply text.
    Reply(String),
}

/// Single handler concept: optional before / handle / after. The chain runs
/// all before → handle until Stop/Reply → all after in reverse.
#[async_trait::async_trait]
pub trait Handler: Send + Sync {
    /// Runs before the handle phase. Return false to stop the chain.
    async fn before(&self, _message: &IncomingMessage) -> crate::error::Result<bool> {
        Ok(true)
    }
    /// Processes the message. Return Stop or Reply to end the handle phase.
    async fn handle(&self, _message: &IncomingMessage) -> crate::error::Result<HandlerResponse> {
        Ok(HandlerResponse::Continue)
    }
    /// Runs after the handle phase (reverse order), with the final response.
    async fn after(
        &self,
        _message: &IncomingMessage,
        _response: &HandlerResponse,
    ) -> crate::error::Result<()> {
        Ok(())
    }
}
