// apex-resilience/src/circuit.rs
// ============================================================================
// Module: Circuit Breaker
// Description: Opens after a run of consecutive failures, rejecting calls
//              until a recovery timeout elapses, then allows one trial
//              call before closing again (§4.10).
// ============================================================================

use std::future::Future;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::info;

use crate::error::ResilienceError;

/// Circuit breaker tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures, while closed, before the circuit opens.
    pub failure_threshold: u32,
    /// How long the circuit stays open before allowing a trial call.
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 5, recovery_timeout: Duration::from_secs(30) }
    }
}

#[derive(Debug, Clone, Copy)]
enum State {
    Closed { consecutive_failures: u32 },
    Open { opened_at: Instant },
    HalfOpen,
}

/// Wraps a driver call with open/half-open/closed state.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<State>,
}

impl CircuitBreaker {
    /// Builds a closed circuit breaker governed by `config`.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self { config, state: Mutex::new(State::Closed { consecutive_failures: 0 }) }
    }

    /// `true` if a call would currently be rejected outright.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(*self.state.lock(), State::Open { .. })
    }

    /// Runs `operation` through the breaker: rejected immediately while
    /// open and not yet due for a recovery probe; otherwise run, with the
    /// result feeding the state transition.
    ///
    /// # Errors
    /// `ResilienceError::CircuitOpen` while open and not due for a probe,
    /// otherwise `ResilienceError::NonRetryable` wrapping `operation`'s
    /// own error (the breaker does not itself retry).
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, ResilienceError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.admit() {
            return Err(ResilienceError::CircuitOpen);
        }
        match operation().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                self.on_failure();
                Err(ResilienceError::NonRetryable(err))
            }
        }
    }

    /// `true` if a call is allowed to proceed right now; transitions an
    /// expired `Open` circuit into `HalfOpen` as a side effect.
    fn admit(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            State::Closed { .. } | State::HalfOpen => true,
            State::Open { opened_at } => {
                if opened_at.elapsed() >= self.config.recovery_timeout {
                    *state = State::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn on_success(&self) {
        let mut state = self.state.lock();
        *state = State::Closed { consecutive_failures: 0 };
    }

    fn on_failure(&self) {
        let mut state = self.state.lock();
        *state = match *state {
            State::HalfOpen => {
                info!("circuit re-opened after failed recovery probe");
                State::Open { opened_at: Instant::now() }
            }
            State::Closed { consecutive_failures } => {
                let failures = consecutive_failures + 1;
                if failures >= self.config.failure_threshold {
                    info!(failures, "circuit opened after consecutive failures");
                    State::Open { opened_at: Instant::now() }
                } else {
                    State::Closed { consecutive_failures: failures }
                }
            }
            open @ State::Open { .. } => open,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            recovery_timeout: Duration::from_secs(60),
        });
        let _: Result<(), ResilienceError<&str>> = breaker.call(|| async { Err("boom") }).await;
        assert!(!breaker.is_open());
        let _: Result<(), ResilienceError<&str>> = breaker.call(|| async { Err("boom") }).await;
        assert!(breaker.is_open());

        let result: Result<(), ResilienceError<&str>> = breaker.call(|| async { Ok(()) }).await;
        assert_eq!(result, Err(ResilienceError::CircuitOpen));
    }

    #[tokio::test]
    async fn closes_again_after_a_successful_probe() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::from_millis(1),
        });
        let _: Result<(), ResilienceError<&str>> = breaker.call(|| async { Err("boom") }).await;
        assert!(breaker.is_open());

        tokio::time::sleep(Duration::from_millis(5)).await;
        let result: Result<i32, ResilienceError<&str>> = breaker.call(|| async { Ok(7) }).await;
        assert_eq!(result, Ok(7));
        assert!(!breaker.is_open());
    }
}
