//! Core types and traits for the autoforward system: message/channel models,
//! the MessageProvider and Bot seams, the error taxonomy, and logging init.
//!
//! ## Modules
//!
//! - [`types`] – User, Chat, IncomingMessage, ChannelHandle, SourceMessage
//! - [`provider`] – MessageProvider trait and ProviderError
//! - [`bot`] – Bot trait (send/reply/edit)
//! - [`error`] – BotError and crate Result
//! - [`logger`] – tracing initialization

pub mod bot;
pub mod error;
pub mod logger;
pub mod provider;
pub mod types;

pub use bot::Bot;
pub use error::{BotError, Result};
pub use logger::init_tracing;
pub use provider::{MessageProvider, ProviderError};
pub use types::{
    ChannelHandle, Chat, Handler, HandlerResponse, IncomingMessage, MessageKind, SentRef,
    SourceMessage, ToCoreMessage, ToCoreUser, User,
};
