//! Eviction policy adapters for bounded client maps.
//!
//! These adapters implement the `EvictionPolicy` port (application layer).

pub mod lru;

pub use lru::LruEviction;
