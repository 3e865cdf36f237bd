// apex-cache/src/lib.rs
// ============================================================================
// Crate: apex-cache
// Description: Tiered L1 (in-process)/L2 (driver-backed) cache with
//              single-flight resolve deduplication (§4.3).
// ============================================================================

//! ## Overview
//! [`Cache`] is consulted by the lookup executor on every keyed lookup. A
//! miss at L1 falls through to an optional L2 [`CacheDriver`]; a miss at
//! both falls through to the caller-supplied resolver (the data source
//! driver's `resolve`), with [`SingleFlight`] ensuring only one resolve is
//! in flight per key at a time.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod driver;
mod error;
mod l1;
mod policy;
mod single_flight;
mod stats;

pub use driver::CacheDriver;
pub use error::CacheError;
pub use l1::L1Cache;
pub use policy::CachePolicy;
pub use single_flight::SingleFlight;
pub use stats::CacheStats;

use std::future::Future;
use std::sync::Arc;

use apex_core::Record;
use tracing::warn;

/// The tiered cache the lookup executor calls through for every dataset.
pub struct Cache {
    l1: L1Cache,
    l2: Option<Arc<dyn CacheDriver>>,
    single_flight: SingleFlight,
    policy: CachePolicy,
}

impl Cache {
    /// Builds a cache governed by `policy`, with an optional L2 driver.
    #[must_use]
    pub fn new(policy: CachePolicy, l2: Option<Arc<dyn CacheDriver>>) -> Self {
        Self { l1: L1Cache::new(policy.clone()), l2, single_flight: SingleFlight::new(), policy }
    }

    /// Resolves `key`, consulting L1 then L2 then, on a full miss,
    /// `resolve` (normally the data source driver's `resolve`). A
    /// successful driver resolve populates both tiers before returning.
    ///
    /// # Errors
    /// Propagates whatever error `resolve` itself returns; cache-tier
    /// failures are logged and treated as misses rather than propagated.
    pub async fn resolve<F, Fut, E>(&self, key: &str, resolve: F) -> Result<Option<Record>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Record>, E>>,
    {
        if let Some(value) = self.l1.get(key) {
            return Ok(Some(value));
        }
        if let Some(l2) = &self.l2 {
            match l2.get(key).await {
                Ok(value) => {
                    self.l1.put(key.to_string(), value.clone());
                    return Ok(Some(value));
                }
                Err(CacheError::CacheMiss) => {}
                Err(CacheError::CacheError { message }) => {
                    warn!(key, message, "L2 cache driver error, treating as miss");
                }
            }
        }

        self.single_flight
            .run(key, || async move {
                if let Some(value) = self.l1.get(key) {
                    return Ok(Some(value));
                }
                let outcome = resolve().await?;
                if let Some(record) = &outcome {
                    self.l1.put(key.to_string(), record.clone());
                    if let Some(l2) = &self.l2 {
                        if let Err(err) = l2.put(key, record.clone(), self.policy.ttl).await {
                            warn!(key, %err, "failed to populate L2 cache");
                        }
                    }
                }
                Ok(outcome)
            })
            .await
    }

    /// Removes a single key from L1 (and L2, if configured and reachable).
    pub async fn invalidate(&self, key: &str) {
        self.l1.invalidate(key);
        if let Some(l2) = &self.l2 {
            if let Err(err) = l2.invalidate(key).await {
                warn!(key, %err, "failed to invalidate L2 cache entry");
            }
        }
    }

    /// Removes every key matching a `*`-wildcard glob pattern from L1
    /// (and L2, if configured and reachable).
    pub async fn invalidate_pattern(&self, pattern: &str) {
        self.l1.invalidate_pattern(pattern);
        if let Some(l2) = &self.l2 {
            if let Err(err) = l2.invalidate_pattern(pattern).await {
                warn!(pattern, %err, "failed to invalidate L2 cache pattern");
            }
        }
    }

    /// L1 statistics (hits/misses/evictions/size).
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.l1.stats()
    }
}
