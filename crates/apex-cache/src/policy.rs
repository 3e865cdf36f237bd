// apex-cache/src/policy.rs
// ============================================================================
// Module: Cache Policy
// Description: Per-dataset cache tuning knobs (§4.3).
// ============================================================================

use std::time::Duration;

/// Per-dataset cache configuration. One `CachePolicy` is attached to each
/// `DataSourceId`'s cache entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CachePolicy {
    /// Whether caching is active for this dataset at all.
    pub enabled: bool,
    /// Time-to-live for an entry, from insertion.
    pub ttl: Duration,
    /// Maximum number of entries held in L1 before LRU eviction kicks in.
    pub max_size: usize,
    /// Whether to populate the cache from the driver at startup.
    pub preload_on_startup: bool,
    /// Fraction of the TTL (in `(0.0, 1.0)`) remaining at which a read
    /// should trigger an asynchronous refresh rather than wait for
    /// expiry. `None` disables refresh-ahead.
    pub refresh_ahead_threshold: Option<f64>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(3600),
            max_size: 10_000,
            preload_on_startup: false,
            refresh_ahead_threshold: None,
        }
    }
}

impl CachePolicy {
    /// `true` if `elapsed` into an entry's TTL window means the entry
    /// should be refreshed ahead of expiry rather than served as-is.
    #[must_use]
    pub fn should_refresh_ahead(&self, elapsed: Duration) -> bool {
        match self.refresh_ahead_threshold {
            Some(threshold) if self.ttl > Duration::ZERO => {
                elapsed.as_secs_f64() / self.ttl.as_secs_f64() >= threshold
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_ahead_fires_past_threshold() {
        let policy = CachePolicy {
            ttl: Duration::from_secs(100),
            refresh_ahead_threshold: Some(0.8),
            ..CachePolicy::default()
        };
        assert!(!policy.should_refresh_ahead(Duration::from_secs(70)));
        assert!(policy.should_refresh_ahead(Duration::from_secs(81)));
    }

    #[test]
    fn refresh_ahead_disabled_by_default() {
        assert!(!CachePolicy::default().should_refresh_ahead(Duration::from_secs(10_000)));
    }
}
