// apex-cache/src/l1.rs
// ============================================================================
// Module: L1 Cache
// Description: Per-process LRU-with-TTL cache, safe for concurrent readers.
//              Backed by `dashmap` for lock-striped concurrent access
//              rather than one global mutex. TTL expiry is checked on
//              access, eviction runs over a capacity cap, and invalidation
//              supports glob patterns.
// ============================================================================

use std::time::Duration;
use std::time::Instant;

use apex_core::Record;
use dashmap::DashMap;

use crate::policy::CachePolicy;
use crate::stats::AtomicCacheStats;
use crate::stats::CacheStats;

struct Entry {
    value: Record,
    inserted_at: Instant,
    last_accessed: Instant,
}

impl Entry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() > ttl
    }
}

/// An in-process LRU cache with per-entry TTL.
pub struct L1Cache {
    entries: DashMap<String, Entry>,
    policy: CachePolicy,
    stats: AtomicCacheStats,
}

impl L1Cache {
    /// Builds an empty L1 cache governed by `policy`.
    #[must_use]
    pub fn new(policy: CachePolicy) -> Self {
        Self { entries: DashMap::new(), policy, stats: AtomicCacheStats::default() }
    }

    /// Looks up `key`. Returns `None` on a miss or an expired entry
    /// (expired entries are removed as a side effect).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Record> {
        if !self.policy.enabled {
            return None;
        }
        let expired = self
            .entries
            .get(key)
            .map(|entry| entry.is_expired(self.policy.ttl));
        match expired {
            Some(true) => {
                self.entries.remove(key);
                self.stats.record_eviction(1);
                self.stats.record_miss();
                None
            }
            Some(false) => {
                if let Some(mut entry) = self.entries.get_mut(key) {
                    entry.last_accessed = Instant::now();
                }
                self.stats.record_hit();
                self.entries.get(key).map(|entry| entry.value.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// How long ago `key` was inserted, if present and not expired. Used
    /// by the lookup executor to decide whether a refresh-ahead should
    /// fire (§4.3).
    #[must_use]
    pub fn age_of(&self, key: &str) -> Option<Duration> {
        self.entries.get(key).map(|entry| entry.inserted_at.elapsed())
    }

    /// Inserts or replaces `key`, evicting LRU entries first if this
    /// insert would exceed the policy's `max_size`.
    pub fn put(&self, key: String, value: Record) {
        if !self.policy.enabled {
            return;
        }
        let now = Instant::now();
        self.entries.insert(key, Entry { value, inserted_at: now, last_accessed: now });
        self.evict_over_capacity();
    }

    /// Removes a single key.
    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Removes every key matching a `*`-wildcard glob pattern (at most one
    /// wildcard; `prefix*`, `*suffix`, `prefix*suffix`, or an exact key
    /// with no wildcard at all).
    pub fn invalidate_pattern(&self, pattern: &str) {
        self.entries.retain(|key, _| !glob_match(pattern, key));
    }

    /// Current hit/miss/eviction counters plus live entry count.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len() as u64)
    }

    fn evict_over_capacity(&self) {
        if self.policy.max_size == 0 || self.entries.len() <= self.policy.max_size {
            return;
        }
        let mut by_access: Vec<(String, Instant)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.last_accessed))
            .collect();
        by_access.sort_by_key(|(_, accessed)| *accessed);
        let overflow = self.entries.len() - self.policy.max_size;
        for (key, _) in by_access.into_iter().take(overflow) {
            self.entries.remove(&key);
        }
        self.stats.record_eviction(overflow as u64);
    }
}

fn glob_match(pattern: &str, key: &str) -> bool {
    match pattern.find('*') {
        None => pattern == key,
        Some(star) => {
            let (prefix, suffix) = (&pattern[..star], &pattern[star + 1..]);
            key.starts_with(prefix) && key.ends_with(suffix) && key.len() >= prefix.len() + suffix.len()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::thread::sleep;

    use apex_core::Value;

    use super::*;

    fn record(n: i64) -> Record {
        Record::from_map(BTreeMap::from([("n".to_string(), Value::Int64(n))]))
    }

    #[test]
    fn put_then_get_is_a_hit() {
        let cache = L1Cache::new(CachePolicy::default());
        cache.put("k".to_string(), record(1));
        assert_eq!(cache.get("k"), Some(record(1)));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn expired_entry_is_a_miss_and_is_evicted() {
        let policy = CachePolicy { ttl: Duration::from_millis(5), ..CachePolicy::default() };
        let cache = L1Cache::new(policy);
        cache.put("k".to_string(), record(1));
        sleep(Duration::from_millis(20));
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn invalidate_pattern_removes_matching_keys() {
        let cache = L1Cache::new(CachePolicy::default());
        cache.put("resolve:eur:1".to_string(), record(1));
        cache.put("resolve:eur:2".to_string(), record(2));
        cache.put("resolve:usd:1".to_string(), record(3));
        cache.invalidate_pattern("resolve:eur:*");
        assert_eq!(cache.get("resolve:eur:1"), None);
        assert_eq!(cache.get("resolve:usd:1"), Some(record(3)));
    }

    #[test]
    fn eviction_drops_least_recently_used_over_capacity() {
        let policy = CachePolicy { max_size: 2, ..CachePolicy::default() };
        let cache = L1Cache::new(policy);
        cache.put("a".to_string(), record(1));
        cache.put("b".to_string(), record(2));
        cache.put("c".to_string(), record(3));
        assert_eq!(cache.stats().size, 2);
    }
}
