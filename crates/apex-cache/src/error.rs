// apex-cache/src/error.rs
// ============================================================================
// Module: Cache Errors
// Description: The two failure modes a cache lookup can surface (§4.3).
// ============================================================================

use thiserror::Error;

/// Failure modes for a cache operation. `CacheMiss` is the normal, expected
/// outcome of a lookup; `CacheError` means the cache itself malfunctioned
/// (an L2 driver call failed) and callers should treat it as a miss while
/// incrementing a warning counter, per §4.3.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// No entry for this key (not, by itself, a failure).
    #[error("cache miss")]
    CacheMiss,
    /// The cache backend failed; callers degrade to a miss.
    #[error("cache error: {message}")]
    CacheError {
        /// Description of the underlying failure.
        message: String,
    },
}
