//! Main entry: init logging, build components, recover interrupted jobs,
//! then run the teloxide REPL, spawning the handler chain per message.

use anyhow::Result;
use forward_core::{init_tracing, ToCoreMessage};
use tracing::{error, info, instrument};

use crate::chain::HandlerChain;
use crate::components::{build_components, build_handler_chain};
use crate::config::BotConfig;
use crate::telegram::TelegramMessageWrapper;

/// Validates config, initializes tracing, builds components, resumes jobs
/// that were running at last shutdown, and starts the REPL.
#[instrument(skip(config))]
pub async fn run_bot(config: BotConfig) -> Result<()> {
    config.validate()?;
    init_tracing(&config.log_file)?;

    info!(
        database_url = %config.database_url,
        "Initializing autoforward bot"
    );

    let components = build_components(&config).await?;

    let recovered = components
        .scheduler
        .recover()
        .await
        .map_err(|e| anyhow::anyhow!("Startup recovery failed: {}", e))?;
    if recovered > 0 {
        info!(recovered, "Resubmitted interrupted forwarding jobs");
    }

    let handler_chain = build_handler_chain(&components);
    let teloxide_bot = components.teloxide_bot.clone();

    info!("Bot started successfully");

    run_repl(teloxide_bot, handler_chain).await
}

/// Starts the REPL: each text message is converted to a core message and the
/// handler chain runs in a spawned task so the REPL returns immediately.
pub async fn run_repl(bot: teloxide::Bot, handler_chain: HandlerChain) -> Result<()> {
    let chain = handler_chain;
    teloxide::repl(
        bot,
        move |_bot: teloxide::Bot, msg: teloxide::types::Message| {
            let chain = chain.clone();

            async move {
                if msg.text().is_some() {
                    let core_msg = TelegramMessageWrapper(&msg).to_core();
                    info!(
                        user_id = core_msg.user.id,
                        chat_id = core_msg.chat.id,
                        "Received message"
                    );

                    let chain_for_task = chain.clone();
                    tokio::spawn(async move {
                        if let Err(e) = chain_for_task.handle(&core_msg).await {
                            error!(error = %e, user_id = core_msg.user.id, "Handler chain failed");
                        }
                    });
                }

                Ok(())
            }
        },
    )
    .await;

    Ok(())
}
