//! Telegram transport layer: adapters, Bot implementation, MessageProvider
//! implementation, and the progress sink that edits the status message.

mod adapters;
mod bot_adapter;
mod progress_sink;
mod provider;

pub use adapters::{TelegramMessageWrapper, TelegramUserWrapper};
pub use bot_adapter::TelegramBotAdapter;
pub use progress_sink::TelegramProgressSink;
pub use provider::TelegramProvider;
