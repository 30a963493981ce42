/// Cache module
///
/// TTL cache abstraction used for per-user profiles and per-item scores.
/// Scoring code only talks to [`TtlCache`], so the backing store can be
/// swapped without touching it.

pub mod memory;

pub use memory::MemoryCache;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// A cached value with its validity window
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub inserted_at: Instant,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, ttl: Duration) -> Self {
        let inserted_at = Instant::now();
        Self {
            value,
            inserted_at,
            expires_at: inserted_at + ttl,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Key/value cache where every entry carries its own time-to-live
pub trait TtlCache<K, V>: Send + Sync {
    /// Live entry for `key`; expired entries are never returned
    fn get(&self, key: &K) -> Option<CacheEntry<V>>;

    fn put(&self, key: K, value: V, ttl: Duration);

    fn invalidate(&self, key: &K);

    /// Drop every expired entry, returning how many were evicted
    fn sweep_expired(&self) -> usize;

    /// Entries currently stored, expired-but-unswept ones included
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self);
}

/// Hit/miss counters shared by the engine's caches
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheCounters {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Hit ratio (0.0–1.0); 0.0 before any lookup
    pub fn hit_ratio(&self) -> f64 {
        let h = self.hits() as f64;
        let total = h + self.misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            h / total
        }
    }
}

/// Snapshot of cache occupancy and effectiveness
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct CacheStats {
    pub profile_cache_size: usize,
    pub item_score_cache_size: usize,
    pub approx_hit_ratio: f64,
}

/// Run `sweep` every `interval` on the tokio runtime until the handle is aborted
pub fn spawn_sweeper<F>(interval: Duration, sweep: F) -> JoinHandle<()>
where
    F: Fn() -> usize + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let evicted = sweep();
            if evicted > 0 {
                tracing::debug!(evicted, "swept expired cache entries");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_hit_ratio() {
        let counters = CacheCounters::default();
        assert_eq!(counters.hit_ratio(), 0.0);

        counters.record_hit();
        counters.record_hit();
        counters.record_hit();
        counters.record_miss();
        assert_eq!(counters.hit_ratio(), 0.75);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expiry() {
        let entry = CacheEntry::new(7, Duration::from_secs(10));
        assert!(!entry.is_expired(Instant::now()));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(entry.is_expired(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_expired_entries() {
        let cache: Arc<MemoryCache<String, u32>> = Arc::new(MemoryCache::new());
        cache.put("short".to_string(), 1, Duration::from_secs(5));
        cache.put("long".to_string(), 2, Duration::from_secs(600));

        let sweep_target = Arc::clone(&cache);
        let handle = spawn_sweeper(Duration::from_secs(60), move || {
            sweep_target.sweep_expired()
        });

        tokio::time::sleep(Duration::from_secs(61)).await;
        // let the sweeper task run after the tick
        tokio::task::yield_now().await;

        assert_eq!(cache.len(), 1);
        assert!(cache.get(&"long".to_string()).is_some());
        handle.abort();
    }
}
