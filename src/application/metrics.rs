//! Admission counters for one limiter.
//!
//! Counters are atomics behind an `Arc`, so every clone of a [`Metrics`]
//! handle observes the same values.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking admission statistics.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Requests let through
    requests_admitted: AtomicU64,
    /// Requests answered with 429
    requests_rejected: AtomicU64,
    /// Buckets dropped to respect the client limit
    clients_evicted: AtomicU64,
    /// Buckets dropped by the idle sweep
    clients_swept: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                requests_admitted: AtomicU64::new(0),
                requests_rejected: AtomicU64::new(0),
                clients_evicted: AtomicU64::new(0),
                clients_swept: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn record_admitted(&self) {
        self.inner.requests_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.inner.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.inner.clients_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_swept(&self, count: u64) {
        self.inner.clients_swept.fetch_add(count, Ordering::Relaxed);
    }

    /// Get the total number of admitted requests.
    pub fn requests_admitted(&self) -> u64 {
        self.inner.requests_admitted.load(Ordering::Relaxed)
    }

    /// Get the total number of rejected requests.
    pub fn requests_rejected(&self) -> u64 {
        self.inner.requests_rejected.load(Ordering::Relaxed)
    }

    /// Get the number of client buckets evicted by the size limit.
    pub fn clients_evicted(&self) -> u64 {
        self.inner.clients_evicted.load(Ordering::Relaxed)
    }

    /// Get the number of client buckets removed by idle sweeps.
    pub fn clients_swept(&self) -> u64 {
        self.inner.clients_swept.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_admitted: self.requests_admitted(),
            requests_rejected: self.requests_rejected(),
            clients_evicted: self.clients_evicted(),
            clients_swept: self.clients_swept(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Requests let through
    pub requests_admitted: u64,
    /// Requests rejected
    pub requests_rejected: u64,
    /// Buckets evicted by the size limit
    pub clients_evicted: u64,
    /// Buckets removed by idle sweeps
    pub clients_swept: u64,
}

impl MetricsSnapshot {
    /// Ratio of rejected to total requests (0.0 to 1.0).
    ///
    /// Returns 0.0 if no requests have been checked.
    pub fn rejection_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.requests_rejected as f64 / total as f64
        }
    }

    /// Admitted plus rejected requests.
    pub fn total_requests(&self) -> u64 {
        self.requests_admitted.saturating_add(self.requests_rejected)
    }
}
