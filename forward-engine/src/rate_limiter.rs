//! Per-user sliding-window rate limiter.
//!
//! Each user has an independent window of recent call instants; waiting for
//! one user never blocks another. Entries age out lazily.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Suspends callers until at most `max_calls` calls per user fall within the
/// trailing `period`, then records the call.
pub struct UserRateLimiter {
    max_calls: usize,
    period: Duration,
    windows: DashMap<i64, Arc<Mutex<VecDeque<Instant>>>>,
}

impl UserRateLimiter {
    pub fn new(max_calls: usize, period: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            period,
            windows: DashMap::new(),
        }
    }

    /// Waits for window capacity for `user_id`, then records the call.
    ///
    /// The per-user lock is held across the sleep: calls by the same user are
    /// FIFO by arrival, and once `wait` returns the window holds at most
    /// `max_calls` entries.
    pub async fn wait(&self, user_id: i64) {
        let window = {
            let entry = self.windows.entry(user_id).or_default();
            entry.value().clone()
        };

        let mut calls = window.lock().await;
        loop {
            let now = Instant::now();
            while calls
                .front()
                .map_or(false, |t| now.duration_since(*t) >= self.period)
            {
                calls.pop_front();
            }
            if calls.len() < self.max_calls {
                break;
            }
            let Some(oldest) = calls.front().copied() else {
                break;
            };
            let wait_for = self.period.saturating_sub(now.duration_since(oldest));
            debug!(
                user_id,
                wait_ms = wait_for.as_millis() as u64,
                "rate limit reached, waiting for window capacity"
            );
            sleep(wait_for).await;
        }
        calls.push_back(Instant::now());
    }

    /// Snapshot of current window sizes per user, pruning aged entries.
    pub async fn status(&self) -> HashMap<i64, usize> {
        let handles: Vec<(i64, Arc<Mutex<VecDeque<Instant>>>)> = self
            .windows
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut sizes = HashMap::new();
        let now = Instant::now();
        for (user_id, window) in handles {
            let mut calls = window.lock().await;
            while calls
                .front()
                .map_or(false, |t| now.duration_since(*t) >= self.period)
            {
                calls.pop_front();
            }
            sizes.insert(user_id, calls.len());
        }
        sizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_within_capacity_does_not_wait() {
        let limiter = UserRateLimiter::new(3, Duration::from_secs(60));

        let started = Instant::now();
        for _ in 0..3 {
            limiter.wait(1).await;
        }
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_over_capacity_waits_for_oldest_to_age_out() {
        let limiter = UserRateLimiter::new(2, Duration::from_secs(60));

        let started = Instant::now();
        limiter.wait(1).await;
        limiter.wait(1).await;
        limiter.wait(1).await;
        assert!(started.elapsed() >= Duration::from_secs(60));

        let sizes = limiter.status().await;
        assert!(sizes[&1] <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_users_do_not_block_each_other() {
        let limiter = Arc::new(UserRateLimiter::new(1, Duration::from_secs(60)));
        limiter.wait(1).await;

        // User 1's window is full; user 2 must still pass immediately.
        let started = Instant::now();
        limiter.wait(2).await;
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides_not_resets() {
        let limiter = UserRateLimiter::new(2, Duration::from_secs(10));

        limiter.wait(1).await;
        tokio::time::advance(Duration::from_secs(6)).await;
        limiter.wait(1).await;

        // First call ages out at t=10; the third must wait until then, not
        // until a full period after the second.
        let started = Instant::now();
        limiter.wait(1).await;
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(4));
        assert!(waited < Duration::from_secs(10));
    }
}
