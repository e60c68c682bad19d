//! Engine loop tests: full-range completion, dedup, the retry ladder,
//! stop/resume, and failure modes, driven through a mock provider over
//! in-memory repositories.


use std::sync::Arc;
use std::time::Duration;

use forward_core::{MessageKind, ProviderError, SourceMessage};
use forward_engine::{EngineError, Forwarder, ForwarderConfig, JobOutcome, UserRateLimiter};
use storage::{DedupRepository, JobRecord, JobRepository, JobStatus, SqlitePoolManager};

use mock_provider::{MockProvider, RecordingSink};

fn small_batches() -> ForwarderConfig {
    ForwarderConfig {
        batch_size: 50,
        ..ForwarderConfig::default()
    }
    .without_delays()
}

async fn setup(
    provider: Arc<MockProvider>,
    config: ForwarderConfig,
) -> (Forwarder, JobRepository, DedupRepository) {
    let pool = SqlitePoolManager::new("sqlite::memory:")
        .await
        .expect("Failed to create pool");
    let jobs = JobRepository::new(pool.clone())
        .await
        .expect("Failed to create job repo");
    let dedup = DedupRepository::new(pool)
        .await
        .expect("Failed to create dedup repo");
    let limiter = Arc::new(UserRateLimiter::new(10_000, Duration::from_secs(60)));
    let forwarder = Forwarder::new(provider, jobs.clone(), dedup.clone(), limiter, config);
    (forwarder, jobs, dedup)
}

fn running_job(user_id: i64, start_id: i64, end_id: i64) -> JobRecord {
    let mut job = JobRecord::new(
        user_id,
        "@source".to_string(),
        "@mirror".to_string(),
        start_id,
        end_id,
    );
    job.status = JobStatus::Running;
    job
}

#[tokio::test]
async fn test_full_range_completes_in_two_batches() {
    let provider = Arc::new(MockProvider::with_text_range(100, 199));
    let (forwarder, jobs, _) = setup(provider.clone(), small_batches()).await;
    jobs.upsert(&running_job(1, 100, 199))
        .await
        .expect("Failed to upsert");

    let sink = Arc::new(RecordingSink::new());
    let outcome = forwarder.run(1, sink).await.expect("Run failed");

    assert_eq!(outcome, JobOutcome::Completed);
    assert_eq!(provider.fetch_count(), 2);
    assert_eq!(provider.forwarded().len(), 100);

    let job = jobs.load(1).await.expect("Failed to load").expect("Missing job");
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.forwarded_count, 100);
    assert_eq!(job.current_id, 200);
}

#[tokio::test]
async fn test_known_fingerprint_is_skipped_without_relay() {
    let provider = Arc::new(MockProvider::with_text_range(100, 199));
    provider.insert_message(SourceMessage {
        id: 150,
        kind: MessageKind::Media,
        fingerprint: Some("blob-150".to_string()),
        text: None,
    });
    let (forwarder, jobs, dedup) = setup(provider.clone(), small_batches()).await;
    jobs.upsert(&running_job(1, 100, 199))
        .await
        .expect("Failed to upsert");
    dedup
        .mark_fingerprint_forwarded(1, "blob-150")
        .await
        .expect("Failed to mark");

    let sink = Arc::new(RecordingSink::new());
    let outcome = forwarder.run(1, sink).await.expect("Run failed");

    assert_eq!(outcome, JobOutcome::Completed);
    assert_eq!(provider.attempts_for(150), 0);
    assert!(!provider.forwarded().contains(&150));

    let job = jobs.load(1).await.expect("Failed to load").expect("Missing job");
    assert_eq!(job.forwarded_count, 99);
    assert_eq!(job.current_id, 200);
}

#[tokio::test]
async fn test_provider_rate_limit_sleeps_and_retries_once() {
    let provider = Arc::new(MockProvider::with_text_range(100, 109));
    provider.queue_failure(100, ProviderError::RateLimited(5));
    let (forwarder, jobs, _) = setup(provider.clone(), small_batches()).await;
    jobs.upsert(&running_job(1, 100, 109))
        .await
        .expect("Failed to upsert");

    let started = tokio::time::Instant::now();
    let sink = Arc::new(RecordingSink::new());
    let outcome = forwarder.run(1, sink).await.expect("Run failed");

    assert_eq!(outcome, JobOutcome::Completed);
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(provider.attempts_for(100), 2);
    assert_eq!(
        provider.forwarded().iter().filter(|id| **id == 100).count(),
        1
    );

    let job = jobs.load(1).await.expect("Failed to load").expect("Missing job");
    assert_eq!(job.forwarded_count, 10);
}

#[tokio::test]
async fn test_write_forbidden_fails_job_immediately() {
    let provider = Arc::new(MockProvider::with_text_range(100, 199));
    provider.queue_failure(
        160,
        ProviderError::WriteForbidden("no post rights".to_string()),
    );
    let (forwarder, jobs, _) = setup(provider.clone(), small_batches()).await;
    jobs.upsert(&running_job(1, 100, 199))
        .await
        .expect("Failed to upsert");

    let sink = Arc::new(RecordingSink::new());
    let result = forwarder.run(1, sink).await;

    assert!(matches!(result, Err(EngineError::WriteForbidden(_))));
    // No batch beyond the failing one was fetched.
    assert_eq!(provider.fetch_count(), 2);

    let job = jobs.load(1).await.expect("Failed to load").expect("Missing job");
    assert_eq!(job.status, JobStatus::Failed);
    // Checkpoint reflects the last completed batch, not the partial one.
    assert_eq!(job.current_id, 150);
    assert_eq!(job.forwarded_count, 50);
}

#[tokio::test]
async fn test_second_pass_forwards_nothing_new() {
    let provider = Arc::new(MockProvider::with_text_range(100, 149));
    let (forwarder, jobs, _) = setup(provider.clone(), small_batches()).await;
    jobs.upsert(&running_job(1, 100, 149))
        .await
        .expect("Failed to upsert");

    let sink = Arc::new(RecordingSink::new());
    forwarder.run(1, sink.clone()).await.expect("First run failed");
    assert_eq!(provider.forwarded().len(), 50);

    // Same range again, fresh job row: everything is already marked.
    jobs.upsert(&running_job(1, 100, 149))
        .await
        .expect("Failed to upsert");
    let outcome = forwarder.run(1, sink).await.expect("Second run failed");

    assert_eq!(outcome, JobOutcome::Completed);
    assert_eq!(provider.forwarded().len(), 50);

    let job = jobs.load(1).await.expect("Failed to load").expect("Missing job");
    assert_eq!(job.forwarded_count, 0);
    assert_eq!(job.current_id, 150);
}

#[tokio::test]
async fn test_stop_flag_honored_at_batch_boundary_and_resume_continues() {
    let provider = Arc::new(MockProvider::with_text_range(100, 299));
    let (forwarder, jobs, _) = setup(provider.clone(), small_batches()).await;
    jobs.upsert(&running_job(1, 100, 299))
        .await
        .expect("Failed to upsert");
    // External stop request lands while batch 2 is being fetched.
    provider.stop_job_after_fetch(2, jobs.clone(), 1);

    let sink = Arc::new(RecordingSink::new());
    let outcome = forwarder.run(1, sink.clone()).await.expect("Run failed");
    assert_eq!(outcome, JobOutcome::Stopped);

    let stopped = jobs.load(1).await.expect("Failed to load").expect("Missing job");
    assert_eq!(stopped.status, JobStatus::Stopped);
    // Batch 2 still completed cleanly before the flag was observed.
    assert_eq!(stopped.current_id, 200);
    assert_eq!(stopped.forwarded_count, 100);

    // Resume from the checkpoint: cursor never goes backwards, the count
    // only grows, and nothing is relayed twice.
    jobs.set_status(1, JobStatus::Running)
        .await
        .expect("Failed to set status");
    let outcome = forwarder.run(1, sink).await.expect("Resume failed");
    assert_eq!(outcome, JobOutcome::Completed);

    let finished = jobs.load(1).await.expect("Failed to load").expect("Missing job");
    assert!(finished.current_id >= stopped.current_id);
    assert!(finished.forwarded_count >= stopped.forwarded_count);
    assert_eq!(finished.current_id, 300);
    assert_eq!(finished.forwarded_count, 200);

    let mut relayed = provider.forwarded();
    relayed.sort_unstable();
    relayed.dedup();
    assert_eq!(relayed.len(), 200);
}

#[tokio::test]
async fn test_empty_batches_advance_and_notify() {
    let provider = Arc::new(MockProvider::with_text_range(100, 249));
    provider.remove_messages(150, 199);
    let config = ForwarderConfig {
        batch_size: 50,
        empty_batch_notice_after: 1,
        ..ForwarderConfig::default()
    }
    .without_delays();
    let (forwarder, jobs, _) = setup(provider.clone(), config).await;
    jobs.upsert(&running_job(1, 100, 249))
        .await
        .expect("Failed to upsert");

    let sink = Arc::new(RecordingSink::new());
    let outcome = forwarder.run(1, sink.clone()).await.expect("Run failed");

    assert_eq!(outcome, JobOutcome::Completed);
    let job = jobs.load(1).await.expect("Failed to load").expect("Missing job");
    assert_eq!(job.current_id, 250);
    assert_eq!(job.forwarded_count, 100);

    assert!(sink
        .notices()
        .iter()
        .any(|notice| notice.contains("No messages found")));
    // The empty batch left the count unchanged, so no duplicate progress
    // line was emitted.
    assert_eq!(sink.progress_lines().len(), 2);
}

#[tokio::test]
async fn test_unresolvable_channel_fails_before_loop() {
    let provider = Arc::new(MockProvider::with_text_range(100, 149));
    provider.fail_resolution("@source");
    let (forwarder, jobs, _) = setup(provider.clone(), small_batches()).await;
    jobs.upsert(&running_job(1, 100, 149))
        .await
        .expect("Failed to upsert");

    let sink = Arc::new(RecordingSink::new());
    let result = forwarder.run(1, sink.clone()).await;

    assert!(matches!(result, Err(EngineError::Config(_))));
    assert_eq!(provider.fetch_count(), 0);
    assert!(sink
        .notices()
        .iter()
        .any(|notice| notice.contains("invalid source or destination")));

    let job = jobs.load(1).await.expect("Failed to load").expect("Missing job");
    assert_eq!(job.status, JobStatus::Failed);
}

#[tokio::test]
async fn test_invalid_id_skips_and_continues() {
    let provider = Arc::new(MockProvider::with_text_range(100, 149));
    provider.queue_failure(105, ProviderError::InvalidId(105));
    let (forwarder, jobs, _) = setup(provider.clone(), small_batches()).await;
    jobs.upsert(&running_job(1, 100, 149))
        .await
        .expect("Failed to upsert");

    let sink = Arc::new(RecordingSink::new());
    let outcome = forwarder.run(1, sink.clone()).await.expect("Run failed");

    assert_eq!(outcome, JobOutcome::Completed);
    assert_eq!(provider.attempts_for(105), 1);
    assert!(!provider.forwarded().contains(&105));

    let job = jobs.load(1).await.expect("Failed to load").expect("Missing job");
    assert_eq!(job.forwarded_count, 49);
    assert!(sink.notices().iter().any(|notice| notice.contains("Skipped 1")));
}

#[tokio::test]
async fn test_transient_errors_retry_up_to_bound() {
    let provider = Arc::new(MockProvider::with_text_range(100, 149));
    // One failure then success: retried and relayed.
    provider.queue_failure(110, ProviderError::Other("flaky".to_string()));
    // max_retries failures: given up and skipped.
    for _ in 0..3 {
        provider.queue_failure(120, ProviderError::Other("down".to_string()));
    }
    let (forwarder, jobs, _) = setup(provider.clone(), small_batches()).await;
    jobs.upsert(&running_job(1, 100, 149))
        .await
        .expect("Failed to upsert");

    let sink = Arc::new(RecordingSink::new());
    let outcome = forwarder.run(1, sink).await.expect("Run failed");

    assert_eq!(outcome, JobOutcome::Completed);
    assert_eq!(provider.attempts_for(110), 2);
    assert!(provider.forwarded().contains(&110));
    assert_eq!(provider.attempts_for(120), 3);
    assert!(!provider.forwarded().contains(&120));

    let job = jobs.load(1).await.expect("Failed to load").expect("Missing job");
    assert_eq!(job.forwarded_count, 49);
}

#[tokio::test]
async fn test_service_messages_are_not_relayed() {
    let provider = Arc::new(MockProvider::with_text_range(100, 149));
    provider.insert_message(SourceMessage {
        id: 130,
        kind: MessageKind::Service,
        fingerprint: None,
        text: None,
    });
    let (forwarder, jobs, _) = setup(provider.clone(), small_batches()).await;
    jobs.upsert(&running_job(1, 100, 149))
        .await
        .expect("Failed to upsert");

    let sink = Arc::new(RecordingSink::new());
    forwarder.run(1, sink).await.expect("Run failed");

    assert_eq!(provider.attempts_for(130), 0);
    let job = jobs.load(1).await.expect("Failed to load").expect("Missing job");
    assert_eq!(job.forwarded_count, 49);
    assert_eq!(job.current_id, 150);
}
