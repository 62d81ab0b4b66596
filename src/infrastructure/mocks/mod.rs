//! Mock implementations for testing.
//!
//! Test doubles for the clock and database ports.

pub mod clock;
pub mod rows;

pub use clock::MockClock;
pub use rows::MockRowSource;
