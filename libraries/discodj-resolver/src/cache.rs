//! Bounded caches with per-entry expiry

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// LRU cache whose entries also expire `ttl` after insertion
pub struct TtlCache<K: Hash + Eq, V> {
    entries: Mutex<LruCache<K, Entry<V>>>,
    ttl: Duration,
}

impl<K: Hash + Eq, V: Clone> TtlCache<K, V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Fresh value for `key`; expired entries are dropped on the way
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let lookup = entries
            .get(key)
            .map(|entry| (entry.expires_at > now).then(|| entry.value.clone()));
        match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key, entry);
    }

    pub fn remove(&self, key: &K) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop(key);
    }

    /// Entries held, expired or not
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire() {
        let cache = TtlCache::new(4, Duration::from_secs(60));
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get(&"a"), Some(1));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn least_recent_is_evicted() {
        let cache = TtlCache::new(2, Duration::from_secs(60));
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.get(&"a");
        cache.insert("c", 3);

        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.get(&"c"), Some(3));
    }

    #[tokio::test]
    async fn zero_capacity_still_holds_one() {
        let cache = TtlCache::new(0, Duration::from_secs(1));
        cache.insert(1, "x");
        assert_eq!(cache.len(), 1);
        cache.remove(&1);
        assert!(cache.is_empty());
    }
}
