//! Registry of per-client bucket state.
//!
//! The registry maps each [`ClientId`] to its [`ClientState`], creating a full
//! bucket the first time a client is seen. All buckets of one registry share
//! one [`BucketPolicy`].

use crate::application::ports::{Clock, Storage};
use crate::domain::{bucket::TokenBucket, client::ClientId, policy::BucketPolicy};
use std::sync::Arc;
use std::time::Instant;

/// State tracked for each client.
#[derive(Debug, Clone, Copy)]
pub struct ClientState {
    /// The client's credits
    pub bucket: TokenBucket,
    /// When the client was first seen by this registry
    pub first_seen: Instant,
}

impl ClientState {
    /// Create state for a client seen for the first time at `now`.
    pub fn new(policy: &BucketPolicy, now: Instant) -> Self {
        Self {
            bucket: TokenBucket::full(policy, now),
            first_seen: now,
        }
    }
}

/// Registry managing all client buckets of one limiter.
///
/// Generic over the storage implementation; in production this is
/// `Arc<ShardedStorage<ClientId, ClientState>>`.
#[derive(Clone)]
pub struct BucketRegistry<S>
where
    S: Storage<ClientId, ClientState> + Clone,
{
    storage: S,
    clock: Arc<dyn Clock>,
    policy: BucketPolicy,
}

impl<S> BucketRegistry<S>
where
    S: Storage<ClientId, ClientState> + Clone,
{
    /// Create a new registry with storage, clock, and the policy for new buckets.
    pub fn new(storage: S, clock: Arc<dyn Clock>, policy: BucketPolicy) -> Self {
        Self {
            storage,
            clock,
            policy,
        }
    }

    /// Access or create a client's state with a callback.
    ///
    /// The clock is read once and the same instant is given to both bucket
    /// creation and the callback. The callback runs while the storage holds
    /// exclusive access to this client's entry.
    pub fn with_client_state<F, R>(&self, client: &ClientId, f: F) -> R
    where
        F: FnOnce(&mut ClientState, Instant) -> R,
    {
        let now = self.clock.now();
        let policy = self.policy;
        self.storage.with_entry_mut(
            client.clone(),
            || ClientState::new(&policy, now),
            |state| f(state, now),
        )
    }

    /// Remove every client for which `keep` returns false.
    ///
    /// Returns the number of removed clients.
    pub fn cleanup<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&ClientId, &ClientState, Instant) -> bool,
    {
        let now = self.clock.now();
        let mut removed = 0;
        self.storage.retain(|client, state| {
            let kept = keep(client, state, now);
            if !kept {
                removed += 1;
            }
            kept
        });
        removed
    }

    /// The policy applied to new buckets.
    pub fn policy(&self) -> &BucketPolicy {
        &self.policy
    }

    /// Get the number of tracked clients.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}
