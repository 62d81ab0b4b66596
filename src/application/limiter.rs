//! Per-route admission control.
//!
//! A [`Limiter`] owns the buckets of every client seen on one route and
//! answers the single question the HTTP layer asks before doing any work:
//! may this client's request proceed?

use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, Storage};
use crate::application::registry::{BucketRegistry, ClientState};
use crate::domain::{bucket::Admission, client::ClientId, policy::BucketPolicy};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::eviction::LruEviction;
use crate::infrastructure::storage::ShardedStorage;
use std::sync::Arc;
use thiserror::Error;

/// Client limit applied when none is configured.
pub const DEFAULT_MAX_CLIENTS: usize = 10_000;

/// Storage backing limiters built with [`Limiter::builder`].
pub type SharedBuckets = Arc<ShardedStorage<ClientId, ClientState>>;

/// Error returned when building a [`Limiter`] fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// `max_clients` must be greater than zero
    #[error("max_clients must be greater than 0")]
    ZeroMaxClients,
}

/// Token bucket admission gate keyed by client.
///
/// Cloning is cheap and every clone shares the same buckets and metrics.
///
/// # Example
/// ```
/// use query_gate::{BucketPolicy, ClientId, Limiter};
///
/// let limiter = Limiter::builder()
///     .with_policy(BucketPolicy::new(2.0, 1.0).unwrap())
///     .build()
///     .unwrap();
/// let client = ClientId::from("1.2.3.4");
///
/// assert!(limiter.admit(&client));
/// assert!(limiter.admit(&client));
/// assert!(!limiter.admit(&client));
///
/// // Another client has its own bucket
/// assert!(limiter.admit(&ClientId::from("5.6.7.8")));
/// ```
#[derive(Clone)]
pub struct Limiter<S = SharedBuckets>
where
    S: Storage<ClientId, ClientState> + Clone,
{
    name: Arc<str>,
    registry: BucketRegistry<S>,
    metrics: Metrics,
}

impl<S> Limiter<S>
where
    S: Storage<ClientId, ClientState> + Clone,
{
    /// Create a limiter from its parts.
    ///
    /// # Arguments
    /// * `name` - Label used in logs, usually the route path
    /// * `registry` - Client bucket registry (which contains the clock and policy)
    /// * `metrics` - Metrics tracker
    pub fn new(name: impl Into<Arc<str>>, registry: BucketRegistry<S>, metrics: Metrics) -> Self {
        Self {
            name: name.into(),
            registry,
            metrics,
        }
    }

    /// Decide whether `client` may proceed, spending one credit if so.
    ///
    /// Creates a full bucket for a client seen for the first time. Never
    /// blocks and never fails.
    pub fn admit(&self, client: &ClientId) -> bool {
        self.check(client).is_admit()
    }

    /// Same as [`admit`](Self::admit), returning the decision with its retry hint.
    pub fn check(&self, client: &ClientId) -> Admission {
        let decision = self
            .registry
            .with_client_state(client, |state, now| state.bucket.try_consume(now));

        match decision {
            Admission::Admit => self.metrics.record_admitted(),
            Admission::Reject { retry_after } => {
                self.metrics.record_rejected();
                tracing::debug!(
                    route = %self.name,
                    client = %client,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "request rejected by rate limit"
                );
            }
        }

        decision
    }

    /// Drop every bucket that has refilled to capacity.
    ///
    /// A full bucket behaves exactly like the one a returning client would
    /// get, so this never changes a later decision. Returns the number of
    /// buckets removed.
    pub fn sweep_idle(&self) -> usize {
        let removed = self
            .registry
            .cleanup(|_client, state, now| !state.bucket.is_replenished(now));
        self.metrics.record_swept(removed as u64);
        removed
    }

    /// Label of this limiter.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Policy applied to every bucket.
    pub fn policy(&self) -> &BucketPolicy {
        self.registry.policy()
    }

    /// Number of clients currently tracked.
    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    /// Get a reference to the registry.
    pub fn registry(&self) -> &BucketRegistry<S> {
        &self.registry
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

impl Limiter<SharedBuckets> {
    /// Start building a limiter backed by sharded in-memory storage.
    ///
    /// Defaults: 50 credit burst, 10 credits per second, 10,000 clients with
    /// LRU eviction, system clock.
    pub fn builder() -> LimiterBuilder {
        LimiterBuilder {
            name: "limiter".to_string(),
            policy: BucketPolicy::default(),
            clock: None,
            max_clients: Some(DEFAULT_MAX_CLIENTS),
        }
    }
}

impl std::fmt::Debug for Limiter<SharedBuckets> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Limiter")
            .field("name", &self.name)
            .field("policy", self.policy())
            .field("clients", &self.client_count())
            .finish()
    }
}

/// Builder for [`Limiter`].
#[derive(Debug)]
pub struct LimiterBuilder {
    name: String,
    policy: BucketPolicy,
    clock: Option<Arc<dyn Clock>>,
    max_clients: Option<usize>,
}

impl LimiterBuilder {
    /// Set the label used in logs.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the bucket policy.
    pub fn with_policy(mut self, policy: BucketPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the time source (use `MockClock` in tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Bound the number of tracked clients.
    ///
    /// When the limit is reached, the least recently seen client is evicted
    /// before a new one is inserted. An evicted client that returns starts
    /// again with a full bucket.
    pub fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = Some(max_clients);
        self
    }

    /// Track any number of clients.
    ///
    /// Memory then grows with the number of distinct clients until buckets
    /// are removed by [`Limiter::sweep_idle`].
    pub fn with_unlimited_clients(mut self) -> Self {
        self.max_clients = None;
        self
    }

    /// Build the limiter.
    ///
    /// # Errors
    /// Returns [`BuildError::ZeroMaxClients`] if the client limit is zero.
    pub fn build(self) -> Result<Limiter, BuildError> {
        let metrics = Metrics::new();

        let mut storage = ShardedStorage::new().with_metrics(metrics.clone());
        if let Some(max_clients) = self.max_clients {
            if max_clients == 0 {
                return Err(BuildError::ZeroMaxClients);
            }
            storage = storage.with_eviction_policy(Arc::new(LruEviction::new(max_clients)));
        }

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()));
        let registry = BucketRegistry::new(Arc::new(storage), clock, self.policy);

        Ok(Limiter::new(self.name, registry, metrics))
    }
}
