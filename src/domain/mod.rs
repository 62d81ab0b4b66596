//! Domain layer - pure admission logic with no I/O.
//!
//! - Token bucket arithmetic and the admit/reject decision
//! - Validated bucket policies
//! - Client identity
//!
//! Time is always passed in explicitly, so everything here is deterministic.

pub mod bucket;
pub mod client;
pub mod policy;
