//! # query-gate
//!
//! HTTP gateway that serves a fixed set of PostgreSQL queries as JSON, with
//! every route behind a per-client token bucket.
//!
//! Each route owns an independent [`Limiter`]. A client (keyed by peer IP
//! address) starts with a full bucket of `capacity` credits, spends one per
//! request and regains credits continuously at `refill_per_second`. A request
//! arriving with less than one credit is answered `429 Too Many Requests`
//! before any database work happens.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use query_gate::infrastructure::database::PgRowSource;
//! use query_gate::infrastructure::http::{create_router, AppState, LimiterSettings, RouteLimiters};
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let rows = PgRowSource::from_env(None, 10)?;
//! let limiters = RouteLimiters::build(&LimiterSettings::default())?;
//! let app = create_router(AppState::new(Arc::new(rows)), &limiters);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5555").await?;
//! axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Admission
//!
//! Limiters can be used on their own:
//!
//! ```rust
//! use query_gate::{BucketPolicy, ClientId, Limiter};
//!
//! let limiter = Limiter::builder()
//!     .with_policy(BucketPolicy::new(50.0, 10.0).unwrap())
//!     .build()
//!     .unwrap();
//!
//! let client = ClientId::from("203.0.113.7");
//! let admitted = (0..60).filter(|_| limiter.admit(&client)).count();
//! assert_eq!(admitted, 50);
//! ```
//!
//! ## Memory Management
//!
//! By default each route tracks up to 10,000 clients and evicts the least
//! recently seen one when full. An [`IdleSweeper`] additionally removes
//! buckets that have refilled to capacity, since such a bucket is identical
//! to the one a returning client would get.
//!
//! ## Architecture
//!
//! - **Domain**: token bucket arithmetic, policies, client identity
//! - **Application**: limiter, registry, sweeper and the ports they use
//! - **Infrastructure**: clock, storage, eviction, PostgreSQL, Axum

// Domain layer - pure admission logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

pub mod config;

// Re-export commonly used types for convenience
pub use domain::{
    bucket::{Admission, TokenBucket},
    client::ClientId,
    policy::{BucketPolicy, PolicyError},
};

pub use application::{
    limiter::{BuildError, Limiter, LimiterBuilder, SharedBuckets},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, EvictionCandidate, EvictionPolicy, QueryError, RowSource, Storage},
    registry::{BucketRegistry, ClientState},
    sweeper::{IdleSweeper, ShutdownError, SweeperConfig, SweeperConfigError, SweeperHandle},
};

pub use infrastructure::{
    clock::SystemClock,
    database::PgRowSource,
    eviction::LruEviction,
    http::{create_router, AppState, LimiterSettings, RouteLimiters},
    storage::ShardedStorage,
};
