//! The command surface: thin parsing over the scheduler and repositories.
//!
//! Commands mutate the persisted job/profile and delegate all real work to
//! the engine; `/status` reads the last persisted checkpoint only, never an
//! in-memory value.

use std::sync::Arc;

use async_trait::async_trait;
use forward_core::{Bot, BotError, Handler, HandlerResponse, IncomingMessage, Result};
use forward_engine::{JobRequest, JobScheduler, StopOutcome};
use storage::{JobRecord, JobRepository, JobStatus, ProfileRepository, StorageError};
use tracing::{info, instrument, warn};

use crate::telegram::TelegramProgressSink;

const HELP_TEXT: &str = "Available commands:\n\
/start - Start the bot\n\
/help - Show this help message\n\
/setup - Walk through credential setup step by step\n\
/set_api_id <api_id> - Set the API id\n\
/set_api_hash <api_hash> - Set the API hash\n\
/set_session_string <session_string> - Set the session string\n\
/set_source <channel> - Set the source channel\n\
/set_destination <channel> - Set the destination channel\n\
/start_forwarding <start_id>-<end_id> - Start forwarding the given id range\n\
/resume_forwarding - Resume from the last saved checkpoint\n\
/status - Check forwarding progress\n\
/stop_forwarding - Stop the forwarding process";

pub struct CommandHandler {
    bot: Arc<dyn Bot>,
    jobs: JobRepository,
    profiles: ProfileRepository,
    scheduler: Arc<JobScheduler>,
}

impl CommandHandler {
    pub fn new(
        bot: Arc<dyn Bot>,
        jobs: JobRepository,
        profiles: ProfileRepository,
        scheduler: Arc<JobScheduler>,
    ) -> Self {
        Self {
            bot,
            jobs,
            profiles,
            scheduler,
        }
    }

    async fn reply(&self, message: &IncomingMessage, text: &str) -> Result<HandlerResponse> {
        self.bot.reply_to(message, text).await?;
        Ok(HandlerResponse::Stop)
    }

    async fn cmd_start(&self, message: &IncomingMessage) -> Result<HandlerResponse> {
        info!(user_id = message.user.id, "user started the bot");
        self.reply(
            message,
            "Welcome to the autoforward bot! Use /help to see available commands.",
        )
        .await
    }

    async fn cmd_set_api_id(
        &self,
        message: &IncomingMessage,
        args: &str,
    ) -> Result<HandlerResponse> {
        match args.parse::<i64>() {
            Ok(api_id) => {
                self.profiles
                    .set_api_id(message.user.id, api_id)
                    .await
                    .map_err(db_err)?;
                self.reply(message, "API id set successfully").await
            }
            Err(_) => {
                self.reply(message, "Invalid API id. Please provide a valid integer.")
                    .await
            }
        }
    }

    async fn cmd_set_api_hash(
        &self,
        message: &IncomingMessage,
        args: &str,
    ) -> Result<HandlerResponse> {
        if args.len() != 32 {
            return self
                .reply(message, "Invalid API hash. It should be 32 characters long.")
                .await;
        }
        self.profiles
            .set_api_hash(message.user.id, args)
            .await
            .map_err(db_err)?;
        self.reply(message, "API hash set successfully").await
    }

    async fn cmd_set_session_string(
        &self,
        message: &IncomingMessage,
        args: &str,
    ) -> Result<HandlerResponse> {
        if args.is_empty() {
            return self
                .reply(message, "Usage: /set_session_string <session_string>")
                .await;
        }
        self.profiles
            .set_session_string(message.user.id, args)
            .await
            .map_err(db_err)?;
        self.reply(message, "Session string set successfully").await
    }

    async fn cmd_set_source(
        &self,
        message: &IncomingMessage,
        args: &str,
    ) -> Result<HandlerResponse> {
        if args.is_empty() {
            return self.reply(message, "Usage: /set_source <channel>").await;
        }
        self.profiles
            .set_source(message.user.id, args)
            .await
            .map_err(db_err)?;
        self.reply(message, "Source channel set successfully").await
    }

    async fn cmd_set_destination(
        &self,
        message: &IncomingMessage,
        args: &str,
    ) -> Result<HandlerResponse> {
        if args.is_empty() {
            return self.reply(message, "Usage: /set_destination <channel>").await;
        }
        self.profiles
            .set_destination(message.user.id, args)
            .await
            .map_err(db_err)?;
        self.reply(message, "Destination channel set successfully").await
    }

    async fn cmd_start_forwarding(
        &self,
        message: &IncomingMessage,
        args: &str,
    ) -> Result<HandlerResponse> {
        let user_id = message.user.id;

        let (start_id, end_id) = match parse_range(args) {
            Ok(range) => range,
            Err(reason) => {
                warn!(user_id, args, "invalid start_forwarding arguments");
                return self
                    .reply(
                        message,
                        &format!(
                            "Invalid command format. Use: /start_forwarding <start_id>-<end_id>. {}",
                            reason
                        ),
                    )
                    .await;
            }
        };

        let Some(profile) = self.profiles.load(user_id).await.map_err(db_err)? else {
            return self
                .reply(
                    message,
                    "Please set up your credentials first. Use /help to see the available commands.",
                )
                .await;
        };
        let missing = profile.missing_fields();
        if !missing.is_empty() {
            return self
                .reply(
                    message,
                    &format!(
                        "Please set up the following before starting: {}. Use /help for instructions.",
                        missing.join(", ")
                    ),
                )
                .await;
        }
        if self.scheduler.is_running(user_id) {
            return self
                .reply(
                    message,
                    "Forwarding is already in progress. Use /status to check the progress.",
                )
                .await;
        }

        let (Some(source), Some(destination)) =
            (profile.source.clone(), profile.destination.clone())
        else {
            return self
                .reply(message, "Source and destination channels must be set first.")
                .await;
        };

        let mut job = JobRecord::new(user_id, source, destination, start_id, end_id);
        job.status = JobStatus::Running;
        self.jobs.upsert(&job).await.map_err(db_err)?;

        info!(user_id, start_id, end_id, "starting forwarding job");
        self.submit_with_progress_message(
            message,
            user_id,
            &format!(
                "Forwarding started for messages {}..{}. Use /status to check the progress.",
                start_id, end_id
            ),
        )
        .await
    }

    async fn cmd_resume_forwarding(&self, message: &IncomingMessage) -> Result<HandlerResponse> {
        let user_id = message.user.id;

        let Some(job) = self.jobs.load(user_id).await.map_err(db_err)? else {
            return self
                .reply(message, "No saved forwarding job to resume.")
                .await;
        };
        if self.scheduler.is_running(user_id) || job.status == JobStatus::Stopping {
            return self
                .reply(
                    message,
                    "Forwarding is already in progress. Use /status to check the progress.",
                )
                .await;
        }
        if job.current_id > job.end_id {
            return self
                .reply(message, "That job already completed. Use /start_forwarding for a new range.")
                .await;
        }

        let profile = self.profiles.load(user_id).await.map_err(db_err)?;
        let missing = profile
            .map(|p| p.missing_fields())
            .unwrap_or_else(|| vec!["API id", "API hash", "source channel", "destination channel"]);
        if !missing.is_empty() {
            return self
                .reply(
                    message,
                    &format!(
                        "Please set up the following before resuming: {}. Use /help for instructions.",
                        missing.join(", ")
                    ),
                )
                .await;
        }

        self.jobs
            .set_status(user_id, JobStatus::Running)
            .await
            .map_err(db_err)?;

        info!(
            user_id,
            current_id = job.current_id,
            end_id = job.end_id,
            "resuming forwarding job"
        );
        self.submit_with_progress_message(
            message,
            user_id,
            &format!(
                "Resumed forwarding from message {} to {}. Use /status to check the progress.",
                job.current_id, job.end_id
            ),
        )
        .await
    }

    /// Sends the progress message, builds a sink that edits it in place, and
    /// hands the job to the scheduler.
    async fn submit_with_progress_message(
        &self,
        message: &IncomingMessage,
        user_id: i64,
        text: &str,
    ) -> Result<HandlerResponse> {
        let progress_id = self
            .bot
            .send_message_and_return_id(&message.chat, text)
            .await?;
        let sink = Arc::new(TelegramProgressSink::new(
            self.bot.clone(),
            message.chat.clone(),
            progress_id,
        ));
        self.scheduler
            .submit(JobRequest { user_id, sink })
            .map_err(|e| BotError::Handler(e.to_string()))?;
        Ok(HandlerResponse::Stop)
    }

    async fn cmd_status(&self, message: &IncomingMessage) -> Result<HandlerResponse> {
        let user_id = message.user.id;
        let Some(job) = self.jobs.load(user_id).await.map_err(db_err)? else {
            return self.reply(message, "No forwarding process in progress.").await;
        };

        match job.status {
            JobStatus::Running | JobStatus::Stopping => {
                self.reply(message, &progress_line(&job)).await
            }
            status => {
                self.reply(
                    message,
                    &format!(
                        "No forwarding process in progress. Last run: {} ({}/{}).",
                        status,
                        job.forwarded_count,
                        job.total_messages()
                    ),
                )
                .await
            }
        }
    }

    async fn cmd_stop_forwarding(&self, message: &IncomingMessage) -> Result<HandlerResponse> {
        let user_id = message.user.id;
        let outcome = self
            .scheduler
            .request_stop(user_id)
            .await
            .map_err(db_err)?;
        match outcome {
            StopOutcome::NotRunning => {
                self.reply(message, "No forwarding process in progress.").await
            }
            StopOutcome::Cooperative | StopOutcome::Forced => {
                info!(user_id, "forwarding stopped by user");
                self.reply(message, "Forwarding process stopped.").await
            }
        }
    }
}

#[async_trait]
impl Handler for CommandHandler {
    #[instrument(skip(self, message))]
    async fn handle(&self, message: &IncomingMessage) -> Result<HandlerResponse> {
        let text = message.content.trim();
        if !text.starts_with('/') {
            return Ok(HandlerResponse::Continue);
        }
        let (command, args) = match text.split_once(char::is_whitespace) {
            Some((command, args)) => (command, args.trim()),
            None => (text, ""),
        };

        match command {
            "/start" => self.cmd_start(message).await,
            "/help" => self.reply(message, HELP_TEXT).await,
            "/set_api_id" => self.cmd_set_api_id(message, args).await,
            "/set_api_hash" => self.cmd_set_api_hash(message, args).await,
            "/set_session_string" => self.cmd_set_session_string(message, args).await,
            "/set_source" => self.cmd_set_source(message, args).await,
            "/set_destination" => self.cmd_set_destination(message, args).await,
            "/start_forwarding" => self.cmd_start_forwarding(message, args).await,
            "/resume_forwarding" => self.cmd_resume_forwarding(message).await,
            "/status" => self.cmd_status(message).await,
            "/stop_forwarding" => self.cmd_stop_forwarding(message).await,
            _ => Ok(HandlerResponse::Continue),
        }
    }
}

fn db_err(error: StorageError) -> BotError {
    BotError::Database(error.to_string())
}

/// The status line rendered from the persisted checkpoint; matches what the
/// engine pushes through the progress sink.
fn progress_line(job: &JobRecord) -> String {
    let total = job.total_messages();
    format!(
        "Forwarding progress: {:.2}% ({}/{})",
        job.forwarded_count as f64 * 100.0 / total as f64,
        job.forwarded_count,
        total
    )
}

/// Parses `<start>-<end>` into an inclusive id range.
fn parse_range(args: &str) -> std::result::Result<(i64, i64), String> {
    let (start, end) = args
        .split_once('-')
        .ok_or_else(|| "Expected <start_id>-<end_id>.".to_string())?;
    let start_id: i64 = start
        .trim()
        .parse()
        .map_err(|_| "Start id must be an integer.".to_string())?;
    let end_id: i64 = end
        .trim()
        .parse()
        .map_err(|_| "End id must be an integer.".to_string())?;
    if start_id <= 0 {
        return Err("Message ids must be positive.".to_string());
    }
    if start_id > end_id {
        return Err("Start id must not be greater than end id.".to_string());
    }
    Ok((start_id, end_id))
}
