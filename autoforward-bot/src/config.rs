//! Bot configuration: Telegram connection, database, engine pacing. Loaded
//! from env.

use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use forward_engine::ForwarderConfig;

/// Application configuration; every field has an env-var counterpart.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// BOT_TOKEN
    pub bot_token: String,
    /// TELEGRAM_API_URL (optional custom endpoint)
    pub telegram_api_url: Option<String>,
    /// DATABASE_URL (SQLite file path or `sqlite:` URL)
    pub database_url: String,
    /// LOG_FILE
    pub log_file: String,
    /// MAX_FORWARD_BATCH: messages per fetch/checkpoint cycle
    pub max_forward_batch: i64,
    /// BATCH_DELAY_MIN/MAX: randomized inter-batch pause (seconds)
    pub batch_delay_min_secs: u64,
    pub batch_delay_max_secs: u64,
    /// FORWARD_DELAY_MIN/MAX: the long pause inserted periodically (seconds)
    pub forward_delay_min_secs: u64,
    pub forward_delay_max_secs: u64,
    /// LONG_PAUSE_EVERY: forwarded messages between long pauses
    pub long_pause_every: u64,
    /// RATE_LIMIT_CALLS / RATE_LIMIT_PERIOD_SECS: per-user call allowance
    pub rate_limit_calls: usize,
    pub rate_limit_period_secs: u64,
    /// MAX_RETRIES per message
    pub max_retries: u32,
    /// SCHEDULER_WORKERS
    pub scheduler_workers: usize,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl BotConfig {
    /// Load from environment variables. `token` overrides BOT_TOKEN if provided.
    pub fn load(token: Option<String>) -> Result<Self> {
        let bot_token = match token {
            Some(token) => token,
            None => env::var("BOT_TOKEN").context("BOT_TOKEN not set")?,
        };
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "autoforward.db".to_string());
        let log_file =
            env::var("LOG_FILE").unwrap_or_else(|_| "logs/autoforward.log".to_string());
        let telegram_api_url = env::var("TELEGRAM_API_URL").ok();

        let max_forward_batch = env_parse("MAX_FORWARD_BATCH", 100i64);

        Ok(Self {
            bot_token,
            telegram_api_url,
            database_url,
            log_file,
            max_forward_batch,
            batch_delay_min_secs: env_parse("BATCH_DELAY_MIN", 1),
            batch_delay_max_secs: env_parse("BATCH_DELAY_MAX", 3),
            forward_delay_min_secs: env_parse("FORWARD_DELAY_MIN", 60),
            forward_delay_max_secs: env_parse("FORWARD_DELAY_MAX", 120),
            long_pause_every: env_parse("LONG_PAUSE_EVERY", 100),
            rate_limit_calls: env_parse("RATE_LIMIT_CALLS", max_forward_batch.max(1) as usize),
            rate_limit_period_secs: env_parse("RATE_LIMIT_PERIOD_SECS", 60),
            max_retries: env_parse("MAX_RETRIES", 3),
            scheduler_workers: env_parse("SCHEDULER_WORKERS", 10),
        })
    }

    /// Validate config (URL shape, positive batch size, ordered delay ranges).
    pub fn validate(&self) -> Result<()> {
        if let Some(ref url_str) = self.telegram_api_url {
            if reqwest::Url::parse(url_str).is_err() {
                bail!("TELEGRAM_API_URL is set but not a valid URL: {}", url_str);
            }
        }
        if self.max_forward_batch <= 0 {
            bail!("MAX_FORWARD_BATCH must be positive");
        }
        if self.batch_delay_min_secs > self.batch_delay_max_secs {
            bail!("BATCH_DELAY_MIN must not exceed BATCH_DELAY_MAX");
        }
        if self.forward_delay_min_secs > self.forward_delay_max_secs {
            bail!("FORWARD_DELAY_MIN must not exceed FORWARD_DELAY_MAX");
        }
        if self.rate_limit_calls == 0 {
            bail!("RATE_LIMIT_CALLS must be positive");
        }
        if self.max_retries == 0 {
            bail!("MAX_RETRIES must be positive");
        }
        Ok(())
    }

    /// Engine tuning derived from this config.
    pub fn forwarder_config(&self) -> ForwarderConfig {
        ForwarderConfig {
            batch_size: self.max_forward_batch,
            max_retries: self.max_retries,
            batch_delay_min: Duration::from_secs(self.batch_delay_min_secs),
            batch_delay_max: Duration::from_secs(self.batch_delay_max_secs),
            long_pause_min: Duration::from_secs(self.forward_delay_min_secs),
            long_pause_max: Duration::from_secs(self.forward_delay_max_secs),
            long_pause_every: self.long_pause_every,
            ..ForwarderConfig::default()
        }
    }

    pub fn rate_limit_period(&self) -> Duration {
        Duration::from_secs(self.rate_limit_period_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> BotConfig {
        BotConfig {
            bot_token: "dummy".to_string(),
            telegram_api_url: None,
            database_url: "sqlite::memory:".to_string(),
            log_file: "logs/test.log".to_string(),
            max_forward_batch: 100,
            batch_delay_min_secs: 1,
            batch_delay_max_secs: 3,
            forward_delay_min_secs: 60,
            forward_delay_max_secs: 120,
            long_pause_every: 100,
            rate_limit_calls: 20,
            rate_limit_period_secs: 60,
            max_retries: 3,
            scheduler_workers: 10,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_bad_api_url_rejected() {
        let mut config = base_config();
        config.telegram_api_url = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_delay_range_rejected() {
        let mut config = base_config();
        config.forward_delay_min_secs = 200;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_batch_rejected() {
        let mut config = base_config();
        config.max_forward_batch = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_forwarder_config_mirrors_pacing() {
        let engine = base_config().forwarder_config();
        assert_eq!(engine.batch_size, 100);
        assert_eq!(engine.long_pause_min, Duration::from_secs(60));
        assert_eq!(engine.long_pause_max, Duration::from_secs(120));
        assert_eq!(engine.long_pause_every, 100);
    }
}
