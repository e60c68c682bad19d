//! The forwarding engine: drives one user's job from its persisted
//! checkpoint to completion, stop, or failure.
//!
//! The loop works in batches of message ids. Each batch is fetched, filtered
//! against the dedup store, relayed under the rate limiter with a bounded
//! retry ladder, and then checkpointed. The stop flag is only observed at
//! batch boundaries, so an in-flight relay always completes or fails cleanly
//! before the loop exits.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use forward_core::{ChannelHandle, MessageKind, MessageProvider, ProviderError, SourceMessage};
use storage::{DedupRepository, JobRecord, JobRepository, JobStatus};

use crate::error::{EngineError, JobOutcome};
use crate::progress::ProgressSink;
use crate::rate_limiter::UserRateLimiter;

/// How often a failing checkpoint write is retried before the job is failed.
const CHECKPOINT_ATTEMPTS: u32 = 3;

/// Tuning knobs for the engine loop.
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Messages fetched and processed per batch.
    pub batch_size: i64,
    /// Relay attempts per message for retryable errors.
    pub max_retries: u32,
    /// Upper bound of the per-message random jitter.
    pub message_jitter_max: Duration,
    /// Randomized delay between batches.
    pub batch_delay_min: Duration,
    pub batch_delay_max: Duration,
    /// The materially longer pause inserted every `long_pause_every`
    /// forwarded messages.
    pub long_pause_min: Duration,
    pub long_pause_max: Duration,
    pub long_pause_every: u64,
    /// Consecutive all-empty batches before the sink is notified.
    pub empty_batch_notice_after: u32,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_retries: 3,
            message_jitter_max: Duration::from_secs(1),
            batch_delay_min: Duration::from_secs(1),
            batch_delay_max: Duration::from_secs(3),
            long_pause_min: Duration::from_secs(60),
            long_pause_max: Duration::from_secs(120),
            long_pause_every: 100,
            empty_batch_notice_after: 3,
        }
    }
}

impl ForwarderConfig {
    /// All delays zeroed; used by tests and callers that pace externally.
    pub fn without_delays(mut self) -> Self {
        self.message_jitter_max = Duration::ZERO;
        self.batch_delay_min = Duration::ZERO;
        self.batch_delay_max = Duration::ZERO;
        self.long_pause_min = Duration::ZERO;
        self.long_pause_max = Duration::ZERO;
        self
    }
}

/// What happened to a single relay attempt chain.
enum RelayResult {
    Sent,
    Skipped,
}

/// The forwarding engine. One instance serves all users; per-job state lives
/// in the persisted job record.
pub struct Forwarder {
    provider: Arc<dyn MessageProvider>,
    jobs: JobRepository,
    dedup: DedupRepository,
    rate_limiter: Arc<UserRateLimiter>,
    config: ForwarderConfig,
}

impl Forwarder {
    pub fn new(
        provider: Arc<dyn MessageProvider>,
        jobs: JobRepository,
        dedup: DedupRepository,
        rate_limiter: Arc<UserRateLimiter>,
        config: ForwarderConfig,
    ) -> Self {
        Self {
            provider,
            jobs,
            dedup,
            rate_limiter,
            config,
        }
    }

    /// Drives the user's persisted job until it completes, observes a stop,
    /// or fails. Terminal status is persisted before this returns.
    #[instrument(skip(self, sink))]
    pub async fn run(
        &self,
        user_id: i64,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<JobOutcome, EngineError> {
        match self.drive(user_id, sink).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(user_id, error = %e, "forwarding run failed");
                if let Err(persist_err) = self.jobs.set_status(user_id, JobStatus::Failed).await {
                    error!(user_id, error = %persist_err, "could not persist failed status");
                }
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        user_id: i64,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<JobOutcome, EngineError> {
        let job = self
            .jobs
            .load(user_id)
            .await?
            .ok_or_else(|| EngineError::Config(format!("no job configured for user {}", user_id)))?;

        let (source, destination) = match self.resolve_channels(&job).await {
            Ok(channels) => channels,
            Err(e) => {
                sink.notify(user_id, "Error: invalid source or destination channel.")
                    .await;
                return Err(e);
            }
        };

        info!(
            user_id,
            source = %source,
            destination = %destination,
            start_id = job.start_id,
            end_id = job.end_id,
            current_id = job.current_id,
            "starting forwarding run"
        );

        let total = job.total_messages();
        let mut cursor = job.current_id;
        let mut forwarded = job.forwarded_count;
        let mut last_progress = String::new();
        let mut since_long_pause: u64 = 0;
        let mut empty_streak: u32 = 0;
        let mut skipped: Vec<i64> = Vec::new();

        while cursor <= job.end_id {
            // Stop flag is only observed here, at the batch boundary.
            let current = self.jobs.load(user_id).await?.ok_or_else(|| {
                EngineError::Config(format!("job record for user {} disappeared", user_id))
            })?;
            if current.status != JobStatus::Running {
                info!(user_id, status = %current.status, "stop requested, exiting loop");
                self.jobs
                    .set_status_if(user_id, JobStatus::Stopping, JobStatus::Stopped)
                    .await?;
                return Ok(JobOutcome::Stopped);
            }

            let batch_end = (cursor + self.config.batch_size).min(job.end_id + 1);
            let ids: Vec<i64> = (cursor..batch_end).collect();
            debug!(user_id, from = cursor, to = batch_end - 1, "fetching batch");

            let batch = match self.provider.get_messages(&source, &ids).await {
                Ok(batch) => batch,
                Err(ProviderError::RateLimited(seconds)) => {
                    warn!(user_id, wait_secs = seconds, "fetch rate limited, sleeping");
                    sleep(Duration::from_secs(seconds)).await;
                    continue;
                }
                Err(e) => return Err(EngineError::Provider(e.to_string())),
            };

            let live: Vec<SourceMessage> = batch.into_iter().flatten().collect();
            if live.is_empty() {
                empty_streak += 1;
                warn!(
                    user_id,
                    from = cursor,
                    to = batch_end - 1,
                    streak = empty_streak,
                    "no messages found in batch range"
                );
                if empty_streak == self.config.empty_batch_notice_after {
                    sink.notify(
                        user_id,
                        &format!(
                            "No messages found around ids {}..{}; continuing past the gap.",
                            cursor,
                            batch_end - 1
                        ),
                    )
                    .await;
                }
            } else {
                empty_streak = 0;
                for message in &live {
                    if message.kind == MessageKind::Service {
                        debug!(user_id, message_id = message.id, "skipping service message");
                        continue;
                    }
                    if self.dedup.is_message_forwarded(user_id, message.id).await? {
                        debug!(user_id, message_id = message.id, "already forwarded, skipping");
                        continue;
                    }
                    if let Some(fingerprint) = &message.fingerprint {
                        if self
                            .dedup
                            .is_fingerprint_forwarded(user_id, fingerprint)
                            .await?
                        {
                            warn!(
                                user_id,
                                message_id = message.id,
                                "duplicate content fingerprint, skipping"
                            );
                            skipped.push(message.id);
                            continue;
                        }
                    }

                    match self
                        .relay_with_retry(user_id, &source, &destination, message)
                        .await?
                    {
                        RelayResult::Sent => {
                            self.dedup.mark_message_forwarded(user_id, message.id).await?;
                            if let Some(fingerprint) = &message.fingerprint {
                                self.dedup
                                    .mark_fingerprint_forwarded(user_id, fingerprint)
                                    .await?;
                            }
                            forwarded += 1;
                            since_long_pause += 1;
                        }
                        RelayResult::Skipped => skipped.push(message.id),
                    }

                    self.random_sleep(Duration::ZERO, self.config.message_jitter_max)
                        .await;
                }
            }

            // Cursor covers skipped and empty slots too; progress is never
            // blocked by skips.
            cursor = batch_end;
            self.checkpoint(user_id, forwarded, cursor).await?;

            let progress = format!(
                "Forwarding progress: {:.2}% ({}/{})",
                forwarded as f64 * 100.0 / total as f64,
                forwarded,
                total
            );
            if progress != last_progress {
                sink.progress(user_id, &progress).await;
                last_progress = progress;
            }

            if cursor <= job.end_id {
                if self.config.long_pause_every > 0
                    && since_long_pause >= self.config.long_pause_every
                {
                    info!(
                        user_id,
                        forwarded_since = since_long_pause,
                        "inserting long pause"
                    );
                    self.random_sleep(self.config.long_pause_min, self.config.long_pause_max)
                        .await;
                    since_long_pause = 0;
                } else {
                    self.random_sleep(self.config.batch_delay_min, self.config.batch_delay_max)
                        .await;
                }
            }
        }

        if !skipped.is_empty() {
            let mut preview: String = skipped
                .iter()
                .take(10)
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            if skipped.len() > 10 {
                preview.push_str(", …");
            }
            sink.notify(
                user_id,
                &format!("Skipped {} message(s): {}", skipped.len(), preview),
            )
            .await;
        }

        self.jobs.set_status(user_id, JobStatus::Completed).await?;
        info!(user_id, forwarded, "forwarding completed");
        Ok(JobOutcome::Completed)
    }

    async fn resolve_channels(
        &self,
        job: &JobRecord,
    ) -> Result<(ChannelHandle, ChannelHandle), EngineError> {
        let source = self
            .provider
            .resolve_channel(&job.source)
            .await
            .map_err(|e| EngineError::Config(format!("source channel: {}", e)))?;
        let destination = self
            .provider
            .resolve_channel(&job.destination)
            .await
            .map_err(|e| EngineError::Config(format!("destination channel: {}", e)))?;
        Ok((source, destination))
    }

    /// Relays one message: rate-limiter slot, then the retry ladder.
    ///
    /// A provider rate-limit signal with an explicit wait never consumes a
    /// retry; invalid ids are skipped; a forbidden destination aborts the
    /// whole job; anything else is retried up to the bound and then skipped.
    async fn relay_with_retry(
        &self,
        user_id: i64,
        source: &ChannelHandle,
        destination: &ChannelHandle,
        message: &SourceMessage,
    ) -> Result<RelayResult, EngineError> {
        let mut attempts: u32 = 0;
        loop {
            self.rate_limiter.wait(user_id).await;

            match self.provider.forward(source, destination, &[message.id]).await {
                Ok(sent) => {
                    info!(
                        user_id,
                        message_id = message.id,
                        sent_id = sent.first().map(|s| s.message_id),
                        "message forwarded"
                    );
                    return Ok(RelayResult::Sent);
                }
                Err(ProviderError::RateLimited(seconds)) => {
                    warn!(
                        user_id,
                        message_id = message.id,
                        wait_secs = seconds,
                        "provider rate limit, sleeping before retry"
                    );
                    sleep(Duration::from_secs(seconds)).await;
                }
                Err(ProviderError::InvalidId(id)) => {
                    warn!(user_id, message_id = id, "invalid message id, skipping");
                    return Ok(RelayResult::Skipped);
                }
                Err(ProviderError::WriteForbidden(reason)) => {
                    error!(user_id, reason = %reason, "destination refused writes, aborting job");
                    return Err(EngineError::WriteForbidden(reason));
                }
                Err(e) => {
                    attempts += 1;
                    if attempts >= self.config.max_retries {
                        warn!(
                            user_id,
                            message_id = message.id,
                            error = %e,
                            attempts,
                            "giving up on message after retries"
                        );
                        return Ok(RelayResult::Skipped);
                    }
                    warn!(
                        user_id,
                        message_id = message.id,
                        error = %e,
                        attempt = attempts,
                        "relay failed, retrying"
                    );
                }
            }
        }
    }

    /// Persists the checkpoint, retrying with exponential backoff; persistent
    /// failure is job-fatal rather than silently losing progress.
    async fn checkpoint(
        &self,
        user_id: i64,
        forwarded_count: i64,
        current_id: i64,
    ) -> Result<(), EngineError> {
        let mut backoff = Duration::from_millis(500);
        let mut attempt: u32 = 0;
        loop {
            match self
                .jobs
                .update_progress(user_id, forwarded_count, current_id)
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) => {
                    attempt += 1;
                    if attempt >= CHECKPOINT_ATTEMPTS {
                        error!(user_id, error = %e, "checkpoint kept failing, abandoning job");
                        return Err(EngineError::Persistence(e));
                    }
                    warn!(
                        user_id,
                        error = %e,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "checkpoint write failed, backing off"
                    );
                    sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }

    async fn random_sleep(&self, min: Duration, max: Duration) {
        let delay = if max <= min {
            min
        } else {
            let millis =
                rand::thread_rng().gen_range(min.as_millis() as u64..=max.as_millis() as u64);
            Duration::from_millis(millis)
        };
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}
