//! Storage implementations for client state.
//!
//! Provides concurrent, sharded storage with an optional entry limit enforced
//! through an [`EvictionPolicy`].

use crate::application::metrics::Metrics;
use crate::application::ports::{EvictionCandidate, EvictionPolicy, Storage};
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Slot<V> {
    value: V,
    last_access: u64,
}

/// Thread-safe sharded storage backed by DashMap.
///
/// [`Storage::with_entry_mut`] runs under the shard's write lock, so the
/// lookup, the insertion of a missing entry and the caller's update form one
/// atomic step per key.
#[derive(Debug)]
pub struct ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    map: DashMap<K, Slot<V>>,
    access_seq: AtomicU64,
    eviction: Option<Arc<dyn EvictionPolicy<K, V>>>,
    metrics: Option<Metrics>,
}

impl<K, V> ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an unbounded storage instance.
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
            access_seq: AtomicU64::new(0),
            eviction: None,
            metrics: None,
        }
    }

    /// Consult `policy` before every insertion of a new key.
    pub fn with_eviction_policy(mut self, policy: Arc<dyn EvictionPolicy<K, V>>) -> Self {
        self.eviction = Some(policy);
        self
    }

    /// Count evictions in `metrics`.
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn next_access(&self) -> u64 {
        self.access_seq.fetch_add(1, Ordering::Relaxed)
    }

    fn make_room(&self) {
        let Some(policy) = &self.eviction else {
            return;
        };

        while policy.should_evict(self.map.len()) {
            // All entries: a fixed prefix of the iteration would always offer the same keys.
            // Collect first: removing while an iterator holds a shard lock deadlocks
            let candidates: Vec<EvictionCandidate<K, V>> = self
                .map
                .iter()
                .map(|entry| EvictionCandidate {
                    key: entry.key().clone(),
                    value: entry.value().value.clone(),
                    last_access: entry.value().last_access,
                })
                .collect();

            let Some(victim) = policy.select_victim(&candidates) else {
                break;
            };

            if self.map.remove(&victim).is_some() {
                if let Some(metrics) = &self.metrics {
                    metrics.record_eviction();
                }
            }
        }
    }
}

impl<K, V> Default for ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Storage<K, V> for ShardedStorage<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + std::fmt::Debug,
    V: Clone + Send + Sync + std::fmt::Debug,
{
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        let last_access = self.next_access();

        if let Some(mut slot) = self.map.get_mut(&key) {
            slot.last_access = last_access;
            return accessor(&mut slot.value);
        }

        self.make_room();

        let mut slot = self.map.entry(key).or_insert_with(|| Slot {
            value: factory(),
            last_access,
        });
        slot.last_access = last_access;
        accessor(&mut slot.value)
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn retain<F>(&self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.map.retain(|key, slot| f(key, &mut slot.value));
    }
}

// Implement Storage for Arc<ShardedStorage> so one map can back cloned limiters
impl<K, V> Storage<K, V> for Arc<ShardedStorage<K, V>>
where
    K: Hash + Eq + Clone + Send + Sync + std::fmt::Debug,
    V: Clone + Send + Sync + std::fmt::Debug,
{
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        (**self).with_entry_mut(key, factory, accessor)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }

    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        (**self).retain(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::eviction::LruEviction;

    fn contains<K: Eq + Hash + Clone, V: Clone>(storage: &ShardedStorage<K, V>, key: &K) -> bool {
        storage.map.contains_key(key)
    }

    #[test]
    fn test_with_entry_mut_creates_once() {
        let storage: ShardedStorage<&str, u32> = ShardedStorage::new();

        let first = storage.with_entry_mut("a", || 10, |v| {
            *v += 1;
            *v
        });
        let second = storage.with_entry_mut("a", || panic!("must not recreate"), |v| {
            *v += 1;
            *v
        });

        assert_eq!(first, 11);
        assert_eq!(second, 12);
        assert_eq!(storage.len(), 1);
        assert!(!storage.is_empty());
    }

    #[test]
    fn test_retain() {
        let storage: ShardedStorage<u32, u32> = ShardedStorage::new();
        for i in 0..10 {
            storage.with_entry_mut(i, || i, |_| ());
        }

        storage.retain(|_, v| *v % 2 == 0);
        assert_eq!(storage.len(), 5);
        assert!(contains(&storage, &4));
        assert!(!contains(&storage, &5));

        storage.retain(|_, _| false);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_lru_limit_evicts_least_recently_used() {
        let metrics = Metrics::new();
        let storage: ShardedStorage<&str, u32> = ShardedStorage::new()
            .with_eviction_policy(Arc::new(LruEviction::new(3)))
            .with_metrics(metrics.clone());

        storage.with_entry_mut("a", || 1, |_| ());
        storage.with_entry_mut("b", || 2, |_| ());
        storage.with_entry_mut("c", || 3, |_| ());

        // Touch "a" so "b" becomes the oldest
        storage.with_entry_mut("a", || 1, |_| ());
        storage.with_entry_mut("d", || 4, |_| ());

        assert_eq!(storage.len(), 3);
        assert!(contains(&storage, &"a"));
        assert!(!contains(&storage, &"b"));
        assert!(contains(&storage, &"c"));
        assert!(contains(&storage, &"d"));
        assert_eq!(metrics.clients_evicted(), 1);
    }

    #[test]
    fn test_recently_used_keys_survive_wherever_they_are_stored() {
        let storage: ShardedStorage<u32, u32> =
            ShardedStorage::new().with_eviction_policy(Arc::new(LruEviction::new(200)));

        for i in 0..200 {
            storage.with_entry_mut(i, || i, |_| ());
        }

        // The keys the map iterates first are the most recently used
        let touched: Vec<u32> = storage.map.iter().take(64).map(|e| *e.key()).collect();
        for key in &touched {
            storage.with_entry_mut(*key, || 0, |_| ());
        }

        storage.with_entry_mut(10_000, || 0, |_| ());

        let oldest_untouched = (0..200).find(|k| !touched.contains(k)).unwrap();
        assert_eq!(storage.len(), 200);
        assert!(!contains(&storage, &oldest_untouched));
        for key in &touched {
            assert!(contains(&storage, key), "recently used key {} was evicted", key);
        }
        assert!(contains(&storage, &10_000));
    }

    #[test]
    fn test_existing_key_never_triggers_eviction() {
        let storage: ShardedStorage<&str, u32> =
            ShardedStorage::new().with_eviction_policy(Arc::new(LruEviction::new(2)));

        storage.with_entry_mut("a", || 1, |_| ());
        storage.with_entry_mut("b", || 2, |_| ());
        for _ in 0..10 {
            storage.with_entry_mut("a", || 1, |_| ());
            storage.with_entry_mut("b", || 2, |_| ());
        }

        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn test_concurrent_first_access_creates_single_entry() {
        use std::thread;

        let storage: Arc<ShardedStorage<String, u64>> = Arc::new(ShardedStorage::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let storage_clone = Arc::clone(&storage);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    storage_clone.with_entry_mut("shared".to_string(), || 0, |v| *v += 1);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(storage.len(), 1);
        let total = storage.with_entry_mut("shared".to_string(), || 0, |v| *v);
        assert_eq!(total, 8000);
    }
}
