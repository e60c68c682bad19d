//! Error types for the bot core.
//!
//! [`BotError`] is the top-level error used by handlers and the transport
//! adapter; engine-level errors live in the engine crate.

use thiserror::Error;

/// Top-level error for the bot surface (database, transport, handler, config, IO).
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for core operations; uses [`BotError`].
pub type Result<T> = std::result::Result<T, BotError>;
