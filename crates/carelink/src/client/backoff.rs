use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Exponential backoff: `initial`, doubling per retry, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_retries: u32,
    pub initial: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial: Duration::from_millis(500),
            max: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial.saturating_mul(factor).min(self.max)
    }
}

/// Errors that may succeed if the request is repeated.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or the policy's
/// retries are spent.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &BackoffPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + fmt::Display,
{
    let mut retry = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && retry < policy.max_retries => {
                retry += 1;
                let delay = policy.delay(retry);
                debug!(retry, max_retries = policy.max_retries, ?delay, error = %err, "retrying request");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[derive(Debug)]
    struct Failure {
        retryable: bool,
    }

    impl fmt::Display for Failure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "failure (retryable: {})", self.retryable)
        }
    }

    impl Retryable for Failure {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    #[test]
    fn delays_double_until_the_cap() {
        let policy = BackoffPolicy {
            max_retries: 10,
            initial: Duration::from_millis(500),
            max: Duration::from_secs(3),
        };
        let delays: Vec<u64> = (1..=5).map(|retry| policy.delay(retry).as_millis() as u64).collect();
        assert_eq!(delays, vec![500, 1000, 2000, 3000, 3000]);
        assert_eq!(policy.delay(40), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures_with_growing_delays() {
        let attempts = AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<&str, Failure> = retry_with_backoff(&BackoffPolicy::default(), || async {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(Failure { retryable: true })
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result.expect("third attempt succeeds"), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_the_retry_budget() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), Failure> = retry_with_backoff(&BackoffPolicy::default(), || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(Failure { retryable: true })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failures_are_not_retried() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), Failure> = retry_with_backoff(&BackoffPolicy::default(), || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(Failure { retryable: false })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
