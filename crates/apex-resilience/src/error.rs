// apex-resilience/src/error.rs
// ============================================================================
// Module: Resilience Errors
// Description: The outcome of a retried/circuit-broken call, and the
//              `Retryable` contract a driver error type must implement so
//              the wrapper can tell an `AuthError` from a transient one
//              (§4.10: "it never retries AuthError").
// ============================================================================

use thiserror::Error;

/// Implemented by a driver's own error type so `retry_with_backoff` and
/// `CircuitBreaker` know which failures are worth retrying.
pub trait Retryable {
    /// `false` for errors that retrying cannot fix (most notably
    /// authentication failures, per §4.10).
    fn is_retryable(&self) -> bool;
}

/// Wraps a driver call's own error type `E` with the resilience layer's
/// own failure modes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResilienceError<E> {
    /// The circuit breaker is open and not yet due for a recovery probe.
    #[error("circuit breaker is open")]
    CircuitOpen,
    /// The error was not retryable (e.g. `AuthError`); the first failure
    /// is surfaced immediately.
    #[error("non-retryable failure: {0}")]
    NonRetryable(E),
    /// All retry attempts were spent without success.
    #[error("retries exhausted after {attempts} attempt(s): {last}")]
    Exhausted {
        /// Number of attempts made, including the first.
        attempts: u32,
        /// The error from the final attempt.
        last: E,
    },
}

impl<E> ResilienceError<E> {
    /// Borrows the innermost driver error, if this variant carries one.
    pub fn inner(&self) -> Option<&E> {
        match self {
            ResilienceError::CircuitOpen => None,
            ResilienceError::NonRetryable(e) | ResilienceError::Exhausted { last: e, .. } => Some(e),
        }
    }
}
