//! In-memory TTL cache backed by `DashMap`.
//!
//! Concurrent readers never block each other; writes follow a
//! compute-then-store pattern, so two callers missing the same key may both
//! recompute and the last `put` wins.

use crate::cache::{CacheEntry, TtlCache};
use dashmap::DashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

pub struct MemoryCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<K, V> Default for MemoryCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TtlCache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<CacheEntry<V>> {
        let now = Instant::now();
        // Clone out before any removal; holding the ref while removing deadlocks the shard
        let entry = self.entries.get(key).map(|e| e.value().clone())?;

        if entry.is_expired(now) {
            self.entries.remove_if(key, |_, e| e.is_expired(now));
            return None;
        }

        Some(entry)
    }

    fn put(&self, key: K, value: V, ttl: Duration) {
        self.entries.insert(key, CacheEntry::new(value, ttl));
    }

    fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&self) {
        self.entries.clear();
    }
}
