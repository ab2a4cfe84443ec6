//! Expiring key/value cache used for exchange rates and favorites snapshots
//!
//! Entries expire lazily: a stale entry is dropped the first time it is read.
//! When the cache is full, inserting a new key evicts the entry that was
//! inserted longest ago. Reads do not refresh an entry's age, so this is
//! insertion-order eviction rather than LRU.
//!
//! A single coarse lock guards each cache. It is never held across an
//! `.await`, so [`TtlCache::get_or_set`] runs its fetcher unlocked. Two
//! callers missing the same key at the same time will both fetch; the
//! later write wins.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Thread-safe TTL cache with bounded size
pub struct TtlCache<K, V> {
    store: Arc<Mutex<HashMap<K, Entry<V>>>>,
    ttl: Duration,
    max_items: usize,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    /// Create a new cache. `max_items` is clamped to at least one.
    pub fn new(ttl: Duration, max_items: usize) -> Self {
        Self {
            store: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            max_items: max_items.max(1),
        }
    }

    /// Time-to-live applied to every entry
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a value if it is still fresh
    pub fn get(&self, key: &K) -> Option<V> {
        let mut store = self.store.lock();
        match store.get(key) {
            Some(entry) if entry.inserted_at.elapsed() <= self.ttl => {
                return Some(entry.value.clone());
            }
            Some(_) => {}
            None => return None,
        }
        store.remove(key);
        None
    }

    /// Insert or overwrite a value, stamping it with the current time
    pub fn set(&self, key: K, value: V) {
        let mut store = self.store.lock();
        if store.len() >= self.max_items && !store.contains_key(&key) {
            let oldest = store
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                tracing::debug!("Evicting oldest cache entry: {:?}", oldest);
                store.remove(&oldest);
            }
        }
        store.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Get a fresh value or produce it with `fetcher`.
    ///
    /// On a miss the fetcher is awaited once and a successful result is
    /// stored; errors are returned uncached.
    pub async fn get_or_set<F, Fut, E>(&self, key: K, fetcher: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            tracing::debug!("Cache hit for key: {:?}", key);
            return Ok(value);
        }

        tracing::debug!("Cache miss for key: {:?}", key);

        let value = fetcher().await?;
        self.set(key, value.clone());
        Ok(value)
    }

    /// Remove an entry; a no-op when absent
    pub fn delete(&self, key: &K) {
        self.store.lock().remove(key);
    }

    /// Clear all cached entries
    pub fn clear(&self) {
        self.store.lock().clear();
    }

    /// Number of stored entries, including stale ones not yet collected
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ttl: self.ttl,
            max_items: self.max_items,
        }
    }
}
