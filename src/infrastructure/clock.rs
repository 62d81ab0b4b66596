//! Clock adapters.
//!
//! [`SystemClock`] reads the monotonic clock and is what the server uses.
//! Tests drive refill deterministically with `MockClock` from
//! `crate::infrastructure::mocks`, available in unit tests or with the
//! `test-helpers` feature.

use crate::application::ports::Clock;
use std::time::Instant;

/// Monotonic system clock backed by `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
