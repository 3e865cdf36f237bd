// apex-resilience/src/fallback.rs
// ============================================================================
// Module: Fallback Composition & Resolve Keys
// Description: Runs a fallback dataset's resolve when the primary fails,
//              and the idempotence key retries are scoped to: `(datasetRef,
//              key, params)` (§4.10).
// ============================================================================

use std::future::Future;

use tracing::warn;

/// Runs `primary`; on failure, logs and runs `fallback` instead. The
/// fallback's own result (success or failure) is returned as-is.
pub async fn with_fallback<F1, Fut1, F2, Fut2, T, E>(primary: F1, fallback: F2) -> Result<T, E>
where
    F1: FnOnce() -> Fut1,
    Fut1: Future<Output = Result<T, E>>,
    F2: FnOnce() -> Fut2,
    Fut2: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match primary().await {
        Ok(value) => Ok(value),
        Err(err) => {
            warn!(%err, "primary source failed, attempting fallback dataset");
            fallback().await
        }
    }
}

/// The identity a retry/circuit-breaker/cache decision is scoped to:
/// a dataset, a resolved lookup key, and the params map that shaped the
/// query. Two resolves with an equal `ResolveKey` are expected to be
/// idempotent within the driver's declared consistency window (§4.4).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolveKey {
    dataset_ref: String,
    key: String,
    params_fingerprint: String,
}

impl ResolveKey {
    /// Builds a resolve key from a dataset reference, a resolved lookup
    /// key (already joined, if composite), and a stable string
    /// representation of the params map (e.g. a sorted `k=v` join).
    #[must_use]
    pub fn new(dataset_ref: impl Into<String>, key: impl Into<String>, params_fingerprint: impl Into<String>) -> Self {
        Self { dataset_ref: dataset_ref.into(), key: key.into(), params_fingerprint: params_fingerprint.into() }
    }

    /// A stable string form suitable as a cache or circuit-breaker map key.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!("{}::{}::{}", self.dataset_ref, self.key, self.params_fingerprint)
    }
}
