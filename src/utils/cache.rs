//! Create-if-absent concurrent cache.
//!
//! [`ConcurrentCache`] maps keys to shared values that, once published, stay published for the
//! life of the cache. Values are constructed outside of any lock; when two threads race to
//! create the same key, the first publication wins, both callers receive the winner and the
//! losing value is dropped before the call returns.
//!
//! # Example
//! ```rust
//! use std::sync::Arc;
//! use dotbind::utils::cache::ConcurrentCache;
//!
//! let cache: ConcurrentCache<u32, String> = ConcurrentCache::new();
//! let first = cache.get_or_create(7, |key| format!("value-{key}"));
//! let second = cache.get_or_create(7, |_| unreachable!());
//! assert!(Arc::ptr_eq(&first, &second));
//! ```

use std::{
    hash::Hash,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use dashmap::{mapref::entry::Entry, DashMap};

use crate::Result;

/// Hit and miss counters of a [`ConcurrentCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Lookups answered by an already published value
    pub hits: u64,
    /// Lookups that ran a constructor
    pub misses: u64,
    /// Number of published values
    pub entries: usize,
}

/// A concurrent map from keys to `Arc`-shared values without removal.
pub struct ConcurrentCache<K, V> {
    map: DashMap<K, Arc<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> ConcurrentCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        ConcurrentCache {
            map: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the published value for `key`, if any.
    pub fn try_get(&self, key: &K) -> Option<Arc<V>> {
        let value = self.map.get(key).map(|entry| Arc::clone(entry.value()));
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("cache hit");
        }
        value
    }

    /// Returns the value for `key`, constructing it with `create` if absent.
    ///
    /// `create` runs without holding any lock and may run on several threads at once for
    /// the same key; only one result is ever published.
    pub fn get_or_create<F>(&self, key: K, create: F) -> Arc<V>
    where
        F: FnOnce(&K) -> V,
    {
        if let Some(value) = self.try_get(&key) {
            return value;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let created = Arc::new(create(&key));
        self.publish(key, created)
    }

    /// Like [`ConcurrentCache::get_or_create`] with a fallible constructor.
    ///
    /// # Errors
    /// Returns the constructor's error; failures are not cached and a later call retries.
    pub fn get_or_try_create<F>(&self, key: K, create: F) -> Result<Arc<V>>
    where
        F: FnOnce(&K) -> Result<V>,
    {
        if let Some(value) = self.try_get(&key) {
            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let created = Arc::new(create(&key)?);
        Ok(self.publish(key, created))
    }

    /// Publishes an already constructed value unless `key` is taken, returning whichever
    /// value ends up visible.
    pub fn get_or_insert(&self, key: K, value: Arc<V>) -> Arc<V> {
        self.publish(key, value)
    }

    fn publish(&self, key: K, value: Arc<V>) -> Arc<V> {
        match self.map.entry(key) {
            Entry::Occupied(entry) => {
                tracing::debug!("cache publish race lost, dropping duplicate value");
                Arc::clone(entry.get())
            }
            Entry::Vacant(entry) => Arc::clone(entry.insert(value).value()),
        }
    }

    /// Number of published values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if nothing has been published yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Snapshot of all published values, in no particular order.
    #[must_use]
    pub fn values(&self) -> Vec<Arc<V>> {
        self.map.iter().map(|entry| Arc::clone(entry.value())).collect()
    }

    /// Current hit and miss counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.map.len(),
        }
    }
}

impl<K, V> Default for ConcurrentCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
