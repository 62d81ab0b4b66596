//! Token bucket holding one client's request credits.
//!
//! Credits refill continuously: a bucket idle for `t` seconds gains
//! `t × refill_per_second` credits, capped at its capacity. Each admitted
//! request spends exactly one credit.

use crate::domain::policy::BucketPolicy;
use std::time::{Duration, Instant};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Let the request through; one credit was spent.
    Admit,
    /// Reject the request. `retry_after` is the wait until one full credit
    /// will have accrued, assuming no other request consumes it first.
    Reject {
        /// Time until the next credit is available
        retry_after: Duration,
    },
}

impl Admission {
    /// Check if this decision is Admit.
    pub fn is_admit(&self) -> bool {
        matches!(self, Admission::Admit)
    }

    /// Check if this decision is Reject.
    pub fn is_reject(&self) -> bool {
        matches!(self, Admission::Reject { .. })
    }
}

/// A single client's credit counter.
///
/// Invariant: `0 <= available() <= capacity` at every observable point.
///
/// # Example
/// ```
/// use query_gate::{BucketPolicy, TokenBucket};
/// use std::time::{Duration, Instant};
///
/// let policy = BucketPolicy::new(2.0, 1.0).unwrap();
/// let start = Instant::now();
/// let mut bucket = TokenBucket::full(&policy, start);
///
/// assert!(bucket.try_consume(start).is_admit());
/// assert!(bucket.try_consume(start).is_admit());
/// assert!(bucket.try_consume(start).is_reject());
///
/// // One second later one credit has been restored
/// assert!(bucket.try_consume(start + Duration::from_secs(1)).is_admit());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_second: f64,
    credits: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a bucket holding its full capacity, as seen for a new client.
    pub fn full(policy: &BucketPolicy, now: Instant) -> Self {
        Self {
            capacity: policy.capacity(),
            refill_per_second: policy.refill_per_second(),
            credits: policy.capacity(),
            last_refill: now,
        }
    }

    /// Refill for the time elapsed since the last update, then try to spend one credit.
    ///
    /// The refill is applied whether or not the request is admitted. A `now`
    /// earlier than the last update counts as zero elapsed time.
    pub fn try_consume(&mut self, now: Instant) -> Admission {
        self.credits = self.available_at(now);
        self.last_refill = self.last_refill.max(now);

        if self.credits >= 1.0 {
            self.credits -= 1.0;
            Admission::Admit
        } else {
            Admission::Reject {
                retry_after: self.time_until_credit(),
            }
        }
    }

    /// Credits the bucket would hold at `now`, without updating it.
    pub fn available_at(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_refill);
        (self.credits + elapsed.as_secs_f64() * self.refill_per_second).min(self.capacity)
    }

    /// Credits held as of the last update.
    pub fn available(&self) -> f64 {
        self.credits
    }

    /// Whether the bucket would be full at `now`.
    ///
    /// A full bucket admits exactly what a freshly created one would, so it
    /// can be dropped without changing any later decision.
    pub fn is_replenished(&self, now: Instant) -> bool {
        self.available_at(now) >= self.capacity
    }

    /// Maximum credits.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Instant of the last credit update.
    pub fn last_refill(&self) -> Instant {
        self.last_refill
    }

    fn time_until_credit(&self) -> Duration {
        let missing = (1.0 - self.credits).max(0.0);
        // Saturates for rates so small the wait overflows a Duration
        Duration::try_from_secs_f64(missing / self.refill_per_second).unwrap_or(Duration::MAX)
    }
}
