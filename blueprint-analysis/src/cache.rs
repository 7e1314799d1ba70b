//! Append-only caches shared between concurrent requests
//!
//! Values are computed outside the lock and inserted afterwards; when two requests race
//! on the same key the first insert wins and both observe it. Entries only disappear when
//! they are invalidated explicitly.

use crate::registry::LinkDefinition;
use blueprint_model::Blueprint;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
pub struct KeyedCache<V> {
    entries: RwLock<HashMap<String, Arc<V>>>,
}

impl<V> Default for KeyedCache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> KeyedCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        self.entries.read().get(key).cloned()
    }

    /// Insert `value` unless the key is already present. Returns the cached value.
    pub fn insert(&self, key: impl Into<String>, value: V) -> Arc<V> {
        self.entries
            .write()
            .entry(key.into())
            .or_insert_with(|| Arc::new(value))
            .clone()
    }

    /// Return the cached value for `key`, computing it with `compute` on a miss.
    ///
    /// `compute` runs without the lock held. Failures are returned and not cached.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: &str,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        if let Some(cached) = self.get(key) {
            return Ok(cached);
        }
        let value = compute()?;
        Ok(self.insert(key, value))
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    pub fn invalidate_where(&self, predicate: impl Fn(&str) -> bool) {
        self.entries.write().retain(|key, _| !predicate(key));
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Link lookups keyed by `typeA::typeB`. A cached `None` records that no link is
/// registered in that orientation.
pub type LinkDefinitionCache = KeyedCache<Option<Arc<LinkDefinition>>>;

/// Loaded child blueprints keyed by their resolved file path.
pub type ChildBlueprintCache = KeyedCache<Blueprint>;

pub fn link_cache_key(resource_type_a: &str, resource_type_b: &str) -> String {
    format!("{resource_type_a}::{resource_type_b}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn computes_once_per_key() {
        let cache: KeyedCache<usize> = KeyedCache::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let value = cache
                .get_or_try_insert_with::<()>("a::b", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .unwrap();
            assert_eq!(*value, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failures_are_not_cached() {
        let cache: KeyedCache<usize> = KeyedCache::new();
        assert_eq!(cache.get_or_try_insert_with("k", || Err("boom")), Err("boom"));
        assert!(cache.get("k").is_none());
        assert_eq!(*cache.get_or_try_insert_with::<&str>("k", || Ok(1)).unwrap(), 1);
    }

    #[test]
    fn first_insert_wins() {
        let cache: KeyedCache<&str> = KeyedCache::new();
        cache.insert("k", "first");
        assert_eq!(*cache.insert("k", "second"), "first");
    }

    #[test]
    fn invalidation_removes_entries() {
        let cache: KeyedCache<u8> = KeyedCache::new();
        cache.insert(link_cache_key("a", "b"), 1);
        cache.insert(link_cache_key("a", "c"), 2);
        cache.insert(link_cache_key("d", "e"), 3);
        assert!(cache.invalidate("d::e"));
        assert!(!cache.invalidate("d::e"));
        cache.invalidate_where(|key| key.starts_with("a::"));
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_readers_share_one_value() {
        let cache = Arc::new(KeyedCache::<String>::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    cache
                        .get_or_try_insert_with::<()>("shared", || Ok(format!("value-{i}")))
                        .unwrap()
                })
            })
            .collect();
        let values: Vec<Arc<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(values.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(cache.len(), 1);
    }
}
