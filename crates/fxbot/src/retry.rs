//! Retry logic with exponential backoff for upstream calls
//!
//! Attempt `n` failing (1-based) is followed by a sleep of
//! `base_delay * 2^(n-1)` before attempt `n + 1`. There is no jitter and no
//! sleep after the last attempt.

use crate::error::{BotError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry policy configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,

    /// Delay after the first failure; doubles after each further failure
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy. `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Create a policy with no retries
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Sleep that follows failed attempt `attempt` (1-based)
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1_u32 << exponent)
    }

    /// Execute an async upstream operation with retry logic.
    ///
    /// Errors for which [`BotError::is_retryable`] is false are returned as
    /// they are, after a single attempt. Exhausting every attempt yields
    /// [`BotError::Upstream`] carrying the last failure.
    pub async fn execute<F, Fut, T>(&self, service: &'static str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("Attempt {}/{} for {}", attempt, max_attempts, service);

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded after {} retries", service, attempt - 1);
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => {
                    debug!("{} failed with non-retryable error: {}", service, e);
                    return Err(e);
                }
                Err(e) => e,
            };

            if attempt >= max_attempts {
                warn!("{} failed after {} attempts: {}", service, attempt, error);
                return Err(BotError::Upstream {
                    service,
                    attempts: attempt,
                    message: error.to_string(),
                });
            }

            let backoff = self.backoff_duration(attempt);
            warn!(
                "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                service, attempt, max_attempts, error, backoff
            );
            sleep(backoff).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    // Paused-clock sleeps can overshoot by the timer's 1ms resolution
    fn assert_slept(started: Instant, expected: Duration) {
        let elapsed = started.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(5),
            "expected ~{expected:?}, slept {elapsed:?}"
        );
    }

    fn flaky(failures: u32, counter: Arc<AtomicU32>) -> impl FnMut() -> std::future::Ready<Result<u32>> {
        move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(if n <= failures {
                Err(BotError::Provider(format!("HTTP 503 on attempt {n}")))
            } else {
                Ok(n)
            })
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_backoff_sequence() {
        let policy = RetryPolicy::default();
        let delays: Vec<_> = (1..policy.max_attempts)
            .map(|a| policy.backoff_duration(a))
            .collect();
        assert_eq!(delays, vec![Duration::from_millis(500), Duration::from_millis(1000)]);
        assert_eq!(policy.backoff_duration(4), Duration::from_millis(4000));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy::new(100, Duration::from_secs(1));
        assert_eq!(policy.backoff_duration(90), Duration::from_secs(1) * (1 << 31));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_third_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let result = RetryPolicy::default()
            .execute("rates", flaky(2, counter.clone()))
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_slept(started, Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_attempts_fail() {
        let counter = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let result = RetryPolicy::default()
            .execute("rates", flaky(u32::MAX, counter.clone()))
            .await;

        match result {
            Err(BotError::Upstream {
                service,
                attempts,
                message,
            }) => {
                assert_eq!(service, "rates");
                assert_eq!(attempts, 3);
                assert!(message.contains("attempt 3"), "last error kept: {message}");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        // 0.5s + 1.0s, nothing after the final attempt
        assert_slept(started, Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_returns_immediately() {
        let counter = Arc::new(AtomicU32::new(0));
        let count = counter.clone();
        let started = Instant::now();

        let result: Result<u32> = RetryPolicy::default()
            .execute("rates", move || {
                count.fetch_add(1, Ordering::SeqCst);
                async { Err(BotError::InvalidCurrency("U5D".to_string())) }
            })
            .await;

        assert!(matches!(result, Err(BotError::InvalidCurrency(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_slept(started, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_no_retry_policy() {
        let counter = Arc::new(AtomicU32::new(0));
        let result = RetryPolicy::no_retry()
            .execute("explain", flaky(1, counter.clone()))
            .await;

        assert!(matches!(result, Err(BotError::Upstream { attempts: 1, .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
