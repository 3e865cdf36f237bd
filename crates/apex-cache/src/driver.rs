// apex-cache/src/driver.rs
// ============================================================================
// Module: Cache Driver
// Description: The L2 cache collaborator contract: get/put/invalidate/
//              invalidatePattern/stats with TTL per entry.
// ============================================================================

use std::time::Duration;

use apex_core::Record;
use async_trait::async_trait;

use crate::error::CacheError;
use crate::stats::CacheStats;

/// An external, named cache backend an L1 miss may fall through to.
#[async_trait]
pub trait CacheDriver: Send + Sync {
    /// Fetches `key`. A `Err(CacheError::CacheMiss)` is the normal
    /// not-found outcome; any other error represents a driver
    /// malfunction the caller should degrade to a miss for.
    async fn get(&self, key: &str) -> Result<Record, CacheError>;

    /// Stores `value` under `key` with `ttl`.
    async fn put(&self, key: &str, value: Record, ttl: Duration) -> Result<(), CacheError>;

    /// Removes a single key.
    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;

    /// Removes every key matching a `*`-wildcard glob pattern.
    async fn invalidate_pattern(&self, pattern: &str) -> Result<(), CacheError>;

    /// Current counters for this driver, if it tracks them.
    async fn stats(&self) -> Result<CacheStats, CacheError>;
}
