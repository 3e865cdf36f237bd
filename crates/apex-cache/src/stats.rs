// apex-cache/src/stats.rs
// ============================================================================
// Module: Cache Statistics
// Description: Hit/miss/eviction counters surfaced by `Cache::stats`.
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// Point-in-time snapshot of a cache's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Successful L1 or L2 hits.
    pub hits: u64,
    /// Lookups that found nothing at either tier.
    pub misses: u64,
    /// L2 driver failures degraded to a miss.
    pub errors: u64,
    /// Entries removed by TTL expiry or LRU eviction.
    pub evictions: u64,
    /// Entries currently resident in L1.
    pub size: u64,
}

impl CacheStats {
    /// Hit rate in `[0.0, 1.0]`; `0.0` when no lookups have occurred yet.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

#[derive(Debug, Default)]
pub(crate) struct AtomicCacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    evictions: AtomicU64,
}

impl AtomicCacheStats {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, size: u64) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size,
        }
    }
}
