//! # Handler chain
//!
//! Runs a sequence of handlers. Each handler has optional before/handle/after:
//! all before run in order (any false stops the chain); then handle runs until
//! Stop or Reply; then all after run in reverse.

use forward_core::{Handler, HandlerResponse, IncomingMessage, Result};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Chain of handlers: before (all) → handle (until Stop/Reply) → after (reverse).
#[derive(Clone, Default)]
pub struct HandlerChain {
    handlers: Vec<Arc<dyn Handler>>,
}

impl HandlerChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler.
    pub fn add_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Runs all before → handle until Stop/Reply → all after in reverse.
    #[instrument(skip(self, message))]
    pub async fn handle(&self, message: &IncomingMessage) -> Result<HandlerResponse> {
        let mut final_response = HandlerResponse::Continue;

        for handler in &self.handlers {
            let should_continue = handler.before(message).await?;
            if !should_continue {
                info!(user_id = message.user.id, "before returned false, chain stopped");
                return Ok(HandlerResponse::Stop);
            }
        }

        for handler in &self.handlers {
            let name = std::any::type_name_of_val(handler.as_ref());
            let response = handler.handle(message).await?;
            debug!(handler = %name, response = ?response, "Handler processed");

            match response {
                HandlerResponse::Stop | HandlerResponse::Reply(_) => {
                    final_response = response;
                    break;
                }
                HandlerResponse::Continue | HandlerResponse::Ignore => {}
            }
        }

        for handler in self.handlers.iter().rev() {
            handler.after(message, &final_response).await?;
        }

        Ok(final_response)
    }
}
