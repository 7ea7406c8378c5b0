//! In-process TTL caching
//!
//! One generic cache backs both the discovery cache and the tool-result
//! cache. Entries expire by TTL, are removed lazily on lookup and by a
//! periodic sweep, and the cache approximates LRU by moving hit entries to
//! the back and evicting from the front on overflow.

use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::models::TimeRange;

/// A cached value with its creation time and TTL
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    value: T,
    created_at: Instant,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
        }
    }

    /// An entry is visible only while `now <= created_at + ttl`
    fn is_fresh(&self, now: Instant) -> bool {
        now <= self.created_at + self.ttl
    }
}

/// Bounded TTL cache safe for concurrent use
///
/// Ordering doubles as recency: front is oldest, back is most recent.
/// Capacity is small (hundreds of entries), so linear key scans are fine.
pub struct TtlCache<K, V> {
    entries: Mutex<VecDeque<(K, CacheEntry<V>)>>,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    /// Create a cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    /// Look up a fresh entry, moving it to the back on hit
    ///
    /// An expired entry under the key is removed and treated as absent.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let index = entries.iter().position(|(k, _)| k == key)?;
        if !entries[index].1.is_fresh(now) {
            entries.remove(index);
            return None;
        }

        let entry = entries.remove(index).expect("index just found");
        let value = entry.1.value.clone();
        entries.push_back(entry);
        Some(value)
    }

    /// Insert or replace an entry, evicting the oldest on overflow
    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        let mut entries = self.entries.lock();

        if let Some(index) = entries.iter().position(|(k, _)| *k == key) {
            entries.remove(index);
        }
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back((key, CacheEntry::new(value, ttl)));
    }

    /// Drop every expired entry
    pub fn sweep(&self) {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(_, entry)| entry.is_fresh(now));
        let removed = before - entries.len();
        if removed > 0 {
            trace!(removed, "swept expired cache entries");
        }
    }

    /// Current entry count, including not-yet-swept expired entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Spawn the periodic sweep task for a cache, for the process lifetime
pub fn start_sweeper<K, V>(
    cache: Arc<TtlCache<K, V>>,
    every: Duration,
) -> tokio::task::JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // the first tick fires immediately; skip it
        ticker.tick().await;
        loop {
            ticker.tick().await;
            cache.sweep();
        }
    })
}

/// TTL for a tool result, chosen from the *requested* window width
///
/// Narrow recent windows change quickly; wide historical windows are
/// effectively static within a session.
pub fn ttl_for_range(range: &TimeRange) -> Duration {
    const HOUR_MS: i64 = 3_600_000;
    let span = range.span_ms();
    let ttl = if span < HOUR_MS {
        Duration::from_secs(30)
    } else if span < 24 * HOUR_MS {
        Duration::from_secs(300)
    } else {
        Duration::from_secs(900)
    };
    debug!(span_ms = span, ttl_s = ttl.as_secs(), "selected result TTL");
    ttl
}

/// Canonical cache key for a tool invocation
///
/// `inputs` should be built with `serde_json::json!` so equal inputs always
/// serialize identically.
pub fn cache_key(tool: &str, inputs: &serde_json::Value) -> String {
    format!("{tool}:{inputs}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_by_ttl() {
        let cache: TtlCache<String, i32> = TtlCache::new(8);
        cache.insert("a".to_string(), 1, Duration::from_secs(10));

        assert_eq!(cache.get(&"a".to_string()), Some(1));
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get(&"a".to_string()), None);
        // expired entry was removed lazily
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn overflow_evicts_oldest() {
        let cache: TtlCache<i32, i32> = TtlCache::new(2);
        cache.insert(1, 1, Duration::from_secs(60));
        cache.insert(2, 2, Duration::from_secs(60));
        cache.insert(3, 3, Duration::from_secs(60));

        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(2));
        assert_eq!(cache.get(&3), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn hit_moves_entry_to_back() {
        let cache: TtlCache<i32, i32> = TtlCache::new(2);
        cache.insert(1, 1, Duration::from_secs(60));
        cache.insert(2, 2, Duration::from_secs(60));

        // touch 1 so 2 becomes the eviction candidate
        assert_eq!(cache.get(&1), Some(1));
        cache.insert(3, 3, Duration::from_secs(60));

        assert_eq!(cache.get(&1), Some(1));
        assert_eq!(cache.get(&2), None);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_expired_without_access() {
        let cache: TtlCache<i32, i32> = TtlCache::new(8);
        cache.insert(1, 1, Duration::from_secs(5));
        cache.insert(2, 2, Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(10)).await;
        cache.sweep();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&2), Some(2));
    }

    #[test]
    fn ttl_selection_by_requested_range() {
        let range = |span_ms: i64| TimeRange {
            from_ms: 0,
            to_ms: span_ms,
        };
        // 30m -> 30s, 12h -> 5m, 7d -> 15m
        assert_eq!(ttl_for_range(&range(30 * 60 * 1000)).as_millis(), 30_000);
        assert_eq!(ttl_for_range(&range(12 * 3_600_000)).as_millis(), 300_000);
        assert_eq!(ttl_for_range(&range(7 * 86_400_000)).as_millis(), 900_000);
    }

    #[test]
    fn cache_keys_are_canonical_per_tool_and_inputs() {
        let a = cache_key("operations", &json!({"service": "checkout", "env": "prod"}));
        let b = cache_key("operations", &json!({"service": "checkout", "env": "prod"}));
        let c = cache_key("operations", &json!({"service": "checkout", "env": "staging"}));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("operations:"));
    }
}
