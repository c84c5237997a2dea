//! Generic exponential-backoff retry, used by the fetch loop for attempts
//! beyond the rate-limit-specific sleep-until-next-second retry in
//! `rate_limiter`.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self { max_attempts, base_delay, max_delay }
    }

    /// A policy that never retries: exactly one attempt, regardless of
    /// `should_retry`. For jobs that disabled retry explicitly.
    pub fn single_attempt() -> Self {
        Self { max_attempts: 1, base_delay: Duration::ZERO, max_delay: Duration::ZERO }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.saturating_mul(1 << attempt.min(16));
        scaled.min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_millis(200), max_delay: Duration::from_secs(5) }
    }
}

/// Retries `op` up to `policy.max_attempts` times, sleeping with doubling
/// backoff between attempts. `should_retry` decides whether a given error is
/// worth retrying at all (e.g. transient vs permanent crawl errors); a
/// non-retryable error returns immediately.
pub async fn retry_with_backoff<T, E, Fut>(
    policy: RetryPolicy,
    mut op: impl FnMut(u32) -> Fut,
    should_retry: impl Fn(&E) -> bool,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts || !should_retry(&err) {
                    return Err(err);
                }
                let delay = policy.delay_for(attempt);
                warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying after error");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_when_first_attempt_works() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(10));
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff(
            policy,
            |_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(42) }
            },
            |_| true,
        )
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stops_retrying_once_should_retry_returns_false() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1), Duration::from_millis(10));
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff(
            policy,
            |_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("permanent") }
            },
            |_| false,
        )
        .await;
        assert_eq!(result, Err("permanent"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn single_attempt_never_retries_even_when_should_retry_is_true() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff(
            RetryPolicy::single_attempt(),
            |_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("transient") }
            },
            |_| true,
        )
        .await;
        assert_eq!(result, Err("transient"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_max_attempts_on_persistent_transient_error() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(10));
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff(
            policy,
            |_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("transient") }
            },
            |_| true,
        )
        .await;
        assert_eq!(result, Err("transient"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
