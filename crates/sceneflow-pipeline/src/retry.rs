//! Generic retry with exponential backoff.
//!
//! One utility applied uniformly to every retryable remote call in the
//! pipeline, instead of per-call ad hoc retry loops.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Retry behavior for one class of operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each attempt after.
    pub base_delay: Duration,
    /// Cap on the backoff delay.
    pub max_delay: Duration,
    /// Operation name for logging.
    pub operation: String,
}

impl RetryPolicy {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            operation: operation.into(),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }
}

/// Outcome of a retried operation, carrying the attempt count on failure.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Success(T),
    Exhausted { error: E, attempts: u32 },
}

/// Run `operation` until it succeeds, a non-retryable error occurs, or the
/// attempt budget is spent.
///
/// The closure is invoked fresh per attempt, so attempt-scoped resources
/// (like a fresh upload key) are minted inside it.
pub async fn retry_async<F, Fut, T, E>(
    policy: &RetryPolicy,
    is_retryable: impl Fn(&E) -> bool,
    operation: F,
) -> RetryOutcome<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return RetryOutcome::Success(value),
            Err(e) if attempt + 1 < policy.max_attempts && is_retryable(&e) => {
                let delay = policy.delay_for_attempt(attempt);
                debug!(
                    "{} attempt {} failed, retrying in {:?}: {}",
                    policy.operation,
                    attempt + 1,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(
                    "{} failed after {} attempt(s): {}",
                    policy.operation,
                    attempt + 1,
                    e
                );
                return RetryOutcome::Exhausted {
                    error: e,
                    attempts: attempt + 1,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new("test")
            .with_max_attempts(max_attempts)
            .with_base_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = RetryPolicy::new("test").with_base_delay(Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(8));
    }

    #[test]
    fn test_delay_capped() {
        let policy = RetryPolicy::new("test").with_base_delay(Duration::from_secs(30));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let calls = AtomicU32::new(0);
        let outcome = retry_async(&fast_policy(3), |_| true, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("transient")
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert!(matches!(outcome, RetryOutcome::Success(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempt_budget() {
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<(), &str> = retry_async(&fast_policy(3), |_| true, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("still broken") }
        })
        .await;

        match outcome {
            RetryOutcome::Exhausted { attempts, .. } => assert_eq!(attempts, 3),
            RetryOutcome::Success(_) => panic!("expected exhaustion"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_stops_immediately() {
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<(), &str> = retry_async(&fast_policy(3), |_| false, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("fatal") }
        })
        .await;

        assert!(matches!(
            outcome,
            RetryOutcome::Exhausted { attempts: 1, .. }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
