//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages runtime behavior:
//! - Bucket registry (storage of per-client state)
//! - Limiter (admission decisions for one route)
//! - Idle sweeper (periodic cleanup of replenished buckets)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod limiter;
pub mod metrics;
pub mod ports;
pub mod registry;
pub mod sweeper;
