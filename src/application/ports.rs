//! Ports (interfaces) for the application layer.
//!
//! The application layer depends only on these traits. Infrastructure
//! provides the adapters: `SystemClock`, `ShardedStorage`, `LruEviction`
//! and `PgRowSource`.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Instant;
use thiserror::Error;

/// Candidate entry for eviction consideration.
///
/// Values are cloned out of the map so no shard lock is held while the
/// policy decides.
pub struct EvictionCandidate<K, V> {
    /// The key of the entry
    pub key: K,
    /// The value of the entry (cloned)
    pub value: V,
    /// Access sequence number; larger means more recently used
    pub last_access: u64,
}

/// Port for eviction policy decisions.
pub trait EvictionPolicy<K, V>: Send + Sync + Debug
where
    K: Clone,
    V: Clone,
{
    /// Select a victim from the given candidates.
    ///
    /// # Returns
    /// The key of the entry to evict, or None if no eviction should occur
    fn select_victim(&self, candidates: &[EvictionCandidate<K, V>]) -> Option<K>;

    /// Check if inserting one more entry requires an eviction first.
    fn should_evict(&self, current_entries: usize) -> bool;
}

/// Port for obtaining current time.
///
/// Refill arithmetic reads time only through this trait, so tests can drive
/// it with `MockClock`.
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Port for concurrent key-value storage.
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Access an entry with mutable access, creating it if necessary.
    ///
    /// Implementations must run `factory` and `accessor` while holding
    /// exclusive access to the entry, so that concurrent callers for the same
    /// key are serialized and never observe two different values.
    ///
    /// # Arguments
    /// * `key` - The key to look up
    /// * `factory` - Function to create a new value if the key doesn't exist
    /// * `accessor` - Function that gets mutable access to the value
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Remove entries for which the predicate returns false.
    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool;
}

/// Error raised by a [`RowSource`].
#[derive(Debug, Error)]
pub enum QueryError {
    /// The database could not be reached or rejected the statement.
    #[error("database query failed: {0}")]
    Database(String),
    /// The database answered with something that is not a JSON row array.
    #[error("unexpected query result: {0}")]
    Decode(String),
}

/// Port for executing a fixed query and returning its rows as JSON objects.
#[async_trait]
pub trait RowSource: Send + Sync + Debug {
    /// Run `sql` and return one JSON value per row, in result order.
    ///
    /// An empty result is `Ok(vec![])`, never an error.
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Value>, QueryError>;
}
