//! Bounded LRU cache of query embeddings keyed by exact query text.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

struct Entry {
    vector: Vec<f32>,
    tick: u64,
}

struct Inner {
    entries: HashMap<String, Entry>,
    /// Recency index: smallest tick is least recently used.
    recency: BTreeMap<u64, String>,
    tick: u64,
}

pub struct EmbeddingCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for EmbeddingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl EmbeddingCache {
    /// A capacity of zero disables caching.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                tick: 0,
            }),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up `key`, marking it most recently used.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.tick += 1;
        let tick = inner.tick;
        let Inner {
            entries, recency, ..
        } = &mut *inner;
        let entry = entries.get_mut(key)?;
        recency.remove(&entry.tick);
        recency.insert(tick, key.to_owned());
        entry.tick = tick;
        Some(entry.vector.clone())
    }

    /// Insert or refresh `key`, evicting the least recently used entry when full.
    pub fn insert(&self, key: &str, vector: Vec<f32>) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.tick += 1;
        let tick = inner.tick;
        let Inner {
            entries, recency, ..
        } = &mut *inner;

        if let Some(entry) = entries.get_mut(key) {
            recency.remove(&entry.tick);
            entry.tick = tick;
            entry.vector = vector;
        } else {
            if entries.len() >= self.capacity
                && let Some((_, oldest)) = recency.pop_first()
            {
                entries.remove(&oldest);
            }
            entries.insert(key.to_owned(), Entry { vector, tick });
        }
        recency.insert(tick, key.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn get_returns_inserted_vector() {
        let cache = EmbeddingCache::new(2);
        cache.insert("q", vec![1.0, 2.0]);
        assert_eq!(cache.get("q"), Some(vec![1.0, 2.0]));
        assert_eq!(cache.get("other"), None);
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = EmbeddingCache::new(2);
        cache.insert("a", vec![1.0]);
        cache.insert("b", vec![2.0]);
        assert!(cache.get("a").is_some());
        cache.insert("c", vec![3.0]);

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn reinsert_refreshes_without_growing() {
        let cache = EmbeddingCache::new(2);
        cache.insert("a", vec![1.0]);
        cache.insert("a", vec![9.0]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), Some(vec![9.0]));
    }

    #[test]
    fn zero_capacity_caches_nothing() {
        let cache = EmbeddingCache::new(0);
        cache.insert("a", vec![1.0]);
        assert!(cache.is_empty());
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity(capacity in 1usize..16, keys in prop::collection::vec(0u8..32, 0..200)) {
            let cache = EmbeddingCache::new(capacity);
            for k in keys {
                let key = k.to_string();
                if cache.get(&key).is_none() {
                    cache.insert(&key, vec![f32::from(k)]);
                }
                prop_assert!(cache.len() <= capacity);
            }
        }
    }
}
