//! Query result cache - LRU over finished search results
//!
//! The index is immutable once served, so cached results never go stale.
//! Values are stored behind `Arc` so a hit is a pointer copy.

use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Cache statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Current number of cached entries
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub struct ResultCache<K: Hash + Eq, V> {
    cache: Mutex<LruCache<K, Arc<V>>>,
    stats: RwLock<CacheStats>,
}

impl<K: Hash + Eq, V> ResultCache<K, V> {
    /// `capacity` is clamped to at least one entry
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            stats: RwLock::new(CacheStats {
                capacity: capacity.get(),
                ..Default::default()
            }),
        }
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let hit = self.cache.lock().get(key).cloned();

        let mut stats = self.stats.write();
        if hit.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }

        hit
    }

    pub fn put(&self, key: K, value: Arc<V>) {
        let mut cache = self.cache.lock();
        cache.put(key, value);
        let size = cache.len();
        drop(cache);

        self.stats.write().size = size;
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
        self.stats.write().size = 0;
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }
}
