//! Message handlers: the setup wizard and the command surface.

mod command_handler;
mod setup_handler;

pub use command_handler::CommandHandler;
pub use setup_handler::SetupHandler;
