//! # Autoforward bot application
//!
//! Wires the forwarding engine, storage, and the Telegram surface. Loads
//! config from env, recovers interrupted jobs at startup, and runs the REPL.

pub mod chain;
pub mod cli;
pub mod components;
pub mod config;
pub mod handlers;
pub mod runner;
pub mod telegram;

pub use chain::HandlerChain;
pub use cli::{load_config, Cli, Commands};
pub use components::{build_components, build_handler_chain, BotComponents};
pub use config::BotConfig;
pub use handlers::{CommandHandler, SetupHandler};
pub use runner::{run_bot, run_repl};
pub use telegram::{
    TelegramBotAdapter, TelegramMessageWrapper, TelegramProgressSink, TelegramProvider,
    TelegramUserWrapper,
};
