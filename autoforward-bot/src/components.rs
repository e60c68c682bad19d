//! Component factory: builds repositories, the engine, and the Telegram
//! surface from config. Isolates assembly logic from the runner.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, instrument};

use forward_core::{Bot, MessageProvider};
use forward_engine::{Forwarder, JobScheduler, TaskRegistry, UserRateLimiter};
use storage::{DedupRepository, JobRepository, ProfileRepository, SqlitePoolManager};

use crate::chain::HandlerChain;
use crate::config::BotConfig;
use crate::handlers::{CommandHandler, SetupHandler};
use crate::telegram::{TelegramBotAdapter, TelegramProvider};

/// Core dependencies for run_bot; produced by the component factory.
pub struct BotComponents {
    pub jobs: JobRepository,
    pub dedup: DedupRepository,
    pub profiles: ProfileRepository,
    pub registry: Arc<TaskRegistry>,
    pub scheduler: Arc<JobScheduler>,
    pub teloxide_bot: teloxide::Bot,
    pub bot: Arc<dyn Bot>,
    pub provider: Arc<dyn MessageProvider>,
}

/// Builds BotComponents from config: pool → repositories → limiter →
/// forwarder → registry → scheduler → Telegram adapter + provider.
#[instrument(skip(config))]
pub async fn build_components(config: &BotConfig) -> Result<BotComponents> {
    let pool = SqlitePoolManager::new(&config.database_url)
        .await
        .map_err(|e| {
            error!(error = %e, database_url = %config.database_url, "Failed to open database");
            anyhow::anyhow!("Failed to open database: {}", e)
        })?;
    let jobs = JobRepository::new(pool.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize job storage: {}", e))?;
    let dedup = DedupRepository::new(pool.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize dedup storage: {}", e))?;
    let profiles = ProfileRepository::new(pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize profile storage: {}", e))?;

    let teloxide_bot = {
        let bot = teloxide::Bot::new(config.bot_token.clone());
        if let Some(ref url_str) = config.telegram_api_url {
            match reqwest::Url::parse(url_str) {
                Ok(url) => bot.set_api_url(url),
                Err(e) => {
                    error!(error = %e, url = %url_str, "Invalid TELEGRAM_API_URL, using default");
                    bot
                }
            }
        } else {
            bot
        }
    };

    let bot: Arc<dyn Bot> = Arc::new(TelegramBotAdapter::new(teloxide_bot.clone()));
    let provider: Arc<dyn MessageProvider> =
        Arc::new(TelegramProvider::new(teloxide_bot.clone()));

    let rate_limiter = Arc::new(UserRateLimiter::new(
        config.rate_limit_calls,
        Duration::from_secs(config.rate_limit_period_secs),
    ));
    let forwarder = Arc::new(Forwarder::new(
        provider.clone(),
        jobs.clone(),
        dedup.clone(),
        rate_limiter,
        config.forwarder_config(),
    ));
    let registry = Arc::new(TaskRegistry::new());
    let scheduler = Arc::new(JobScheduler::new(
        forwarder,
        jobs.clone(),
        registry.clone(),
        config.scheduler_workers,
    ));

    info!(
        workers = config.scheduler_workers,
        batch_size = config.max_forward_batch,
        "Components built"
    );

    Ok(BotComponents {
        jobs,
        dedup,
        profiles,
        registry,
        scheduler,
        teloxide_bot,
        bot,
        provider,
    })
}

/// Builds the handler chain (setup wizard → command surface).
pub fn build_handler_chain(components: &BotComponents) -> HandlerChain {
    let setup = Arc::new(SetupHandler::new(
        components.bot.clone(),
        components.profiles.clone(),
    ));
    let commands = Arc::new(CommandHandler::new(
        components.bot.clone(),
        components.jobs.clone(),
        components.profiles.clone(),
        components.scheduler.clone(),
    ));
    HandlerChain::new().add_handler(setup).add_handler(commands)
}
