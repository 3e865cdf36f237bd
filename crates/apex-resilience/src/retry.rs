// apex-resilience/src/retry.rs
// ============================================================================
// Module: Retry with Backoff
// Description: Exponential backoff with jitter, bounded by a maximum
//              attempt count; never retries a non-retryable error (§4.10).
// ============================================================================

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::error::ResilienceError;
use crate::error::Retryable;

/// Exponential-backoff retry configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first, non-retry call.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling applied after exponential growth.
    pub max_delay: Duration,
    /// Fraction of the computed delay to randomize by, in `[0.0, 1.0]`.
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            jitter_fraction: 0.2,
        }
    }
}

impl RetryPolicy {
    /// The delay before the attempt numbered `attempt` (1-based; the
    /// delay preceding the *next* call after `attempt` has failed).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let scaled = self.base_delay.saturating_mul(1u32.checked_shl(exponent).unwrap_or(u32::MAX));
        let capped = scaled.min(self.max_delay);
        jitter(capped, self.jitter_fraction)
    }
}

fn jitter(delay: Duration, fraction: f64) -> Duration {
    if fraction <= 0.0 {
        return delay;
    }
    let mut rng = rand::thread_rng();
    let factor = 1.0 + rng.gen_range(-fraction..=fraction);
    Duration::from_secs_f64((delay.as_secs_f64() * factor).max(0.0))
}

/// Calls `operation` up to `policy.max_attempts` times, sleeping a
/// jittered exponential backoff between attempts. Stops immediately,
/// without consuming a retry, if the error reports itself as
/// non-retryable via [`Retryable::is_retryable`].
///
/// # Errors
/// `ResilienceError::NonRetryable` on the first non-retryable failure,
/// or `ResilienceError::Exhausted` once `max_attempts` is reached.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, ResilienceError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(ResilienceError::NonRetryable(err)),
            Err(err) if attempt >= policy.max_attempts => {
                return Err(ResilienceError::Exhausted { attempts: attempt, last: err });
            }
            Err(err) => {
                let delay = policy.delay_for(attempt);
                debug!(attempt, ?delay, %err, "retrying after transient failure");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    enum FakeError {
        #[error("transient")]
        Transient,
        #[error("auth")]
        Auth,
    }

    impl Retryable for FakeError {
        fn is_retryable(&self) -> bool {
            !matches!(self, FakeError::Auth)
        }
    }

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let policy = RetryPolicy::default();
        let result: Result<i32, ResilienceError<FakeError>> =
            retry_with_backoff(&policy, || async { Ok(42) }).await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn never_retries_auth_errors() {
        let policy = RetryPolicy::default();
        let mut calls = 0;
        let result: Result<i32, ResilienceError<FakeError>> = retry_with_backoff(&policy, || {
            calls += 1;
            async { Err(FakeError::Auth) }
        })
        .await;
        assert_eq!(result, Err(ResilienceError::NonRetryable(FakeError::Auth)));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter_fraction: 0.0,
        };
        let mut calls = 0;
        let result: Result<i32, ResilienceError<FakeError>> = retry_with_backoff(&policy, || {
            calls += 1;
            async { Err(FakeError::Transient) }
        })
        .await;
        assert_eq!(result, Err(ResilienceError::Exhausted { attempts: 3, last: FakeError::Transient }));
        assert_eq!(calls, 3);
    }
}
