//! Infrastructure layer - adapters for the application ports.
//!
//! This layer provides:
//! - Clock abstraction (system time vs mock)
//! - Sharded in-memory bucket storage with LRU eviction
//! - The PostgreSQL row source
//! - The Axum router and admission middleware

pub mod clock;
pub mod database;
pub mod eviction;
pub mod http;
pub mod storage;

/// Mock implementations for testing.
///
/// This module is only available when the `test-helpers` feature is enabled,
/// or during test builds.
///
/// To use these mocks in integration tests, add to your `Cargo.toml`:
/// ```toml
/// [dev-dependencies]
/// query-gate = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
