// apex-cache/src/single_flight.rs
// ============================================================================
// Module: Single-Flight Deduplication
// Description: Ensures only one resolve is in flight per key at a time, to
//              prevent thundering-herd driver calls on a cache miss (§5:
//              "single-flight deduplication (one in-flight resolve per
//              key) is required to prevent thundering herds").
// ============================================================================

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

/// Per-key mutual exclusion for an async resolve step. Callers for the
/// same key queue behind one another; callers for different keys never
/// block each other.
pub struct SingleFlight {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SingleFlight {
    /// Creates an empty registry of per-key locks.
    #[must_use]
    pub fn new() -> Self {
        Self { locks: DashMap::new() }
    }

    /// Runs `compute` with exclusive access for `key`. Callers should
    /// re-check the cache immediately after acquiring the lock (inside
    /// `compute`) before hitting the driver, so a caller that lost the
    /// race observes the winner's freshly populated cache entry instead
    /// of repeating the driver call.
    pub async fn run<F, Fut, T>(&self, key: &str, compute: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;
        compute().await
    }
}

impl Default for SingleFlight {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_calls_for_one_key_run_serially() {
        let flight = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let flight = flight.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                flight
                    .run("shared-key", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.expect("join");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_block_each_other() {
        let flight = SingleFlight::new();
        flight.run("a", || async { 1 }).await;
        flight.run("b", || async { 2 }).await;
    }
}
