//! The message provider seam: everything the forwarding engine needs from a
//! transport, reduced to four operations and an explicit error taxonomy.
//!
//! The engine never sees a transport's own error hierarchy; implementations
//! map whatever they raise onto [`ProviderError`].

use crate::types::{ChannelHandle, SentRef, SourceMessage};
use async_trait::async_trait;
use thiserror::Error;

/// Outcomes a provider call can fail with, as the engine understands them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Transient: the provider asks us to wait before retrying.
    #[error("rate limited, retry after {0}s")]
    RateLimited(u64),
    /// Permanent for this message: the id does not resolve to anything.
    #[error("invalid message id: {0}")]
    InvalidId(i64),
    /// Fatal for the whole job: we may not write to the destination.
    #[error("destination write forbidden: {0}")]
    WriteForbidden(String),
    #[error("message too long for destination")]
    TooLong,
    #[error("channel not found: {0}")]
    NotFound(String),
    #[error("provider error: {0}")]
    Other(String),
}

/// External collaborator that reads from and writes to channels.
#[async_trait]
pub trait MessageProvider: Send + Sync {
    /// Resolves a channel reference (numeric id string or `@username`).
    async fn resolve_channel(&self, reference: &str) -> Result<ChannelHandle, ProviderError>;

    /// Fetches the messages at `ids` from `channel`. The result is aligned
    /// with `ids`; missing positions are `None`.
    async fn get_messages(
        &self,
        channel: &ChannelHandle,
        ids: &[i64],
    ) -> Result<Vec<Option<SourceMessage>>, ProviderError>;

    /// Relays the messages `ids` from `source` into `destination`, dropping
    /// the original author.
    async fn forward(
        &self,
        source: &ChannelHandle,
        destination: &ChannelHandle,
        ids: &[i64],
    ) -> Result<Vec<SentRef>, ProviderError>;

    /// Sends plain text into `channel`.
    async fn send_text(&self, channel: &ChannelHandle, text: &str)
        -> Result<SentRef, ProviderError>;
}
