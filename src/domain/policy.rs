//! Token bucket policy parameters.
//!
//! A [`BucketPolicy`] is the `(capacity, refill rate)` pair that every bucket
//! created by one limiter shares. Policies are validated once, when a route is
//! registered, and never change afterwards.

use thiserror::Error;

/// Burst capacity used when no policy is configured.
pub const DEFAULT_CAPACITY: f64 = 50.0;

/// Refill rate (credits per second) used when no policy is configured.
pub const DEFAULT_REFILL_PER_SECOND: f64 = 10.0;

/// Error returned when policy parameters are invalid.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PolicyError {
    /// Capacity must be finite and at least one credit.
    #[error("capacity must be a finite number >= 1, got {0}")]
    InvalidCapacity(f64),
    /// Refill rate must be finite and strictly positive.
    #[error("refill rate must be a finite number > 0, got {0}")]
    InvalidRefillRate(f64),
}

/// Rate limit policy applied to every client bucket of one limiter.
///
/// # Example
/// ```
/// use query_gate::BucketPolicy;
///
/// // 50 request burst, sustained 10 requests per second
/// let policy = BucketPolicy::new(50.0, 10.0).unwrap();
/// assert_eq!(policy.capacity(), 50.0);
/// assert_eq!(policy.refill_per_second(), 10.0);
///
/// assert!(BucketPolicy::new(0.5, 10.0).is_err());
/// assert!(BucketPolicy::new(50.0, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketPolicy {
    capacity: f64,
    refill_per_second: f64,
}

impl BucketPolicy {
    /// Create a validated policy.
    ///
    /// # Arguments
    /// * `capacity` - Maximum credits a bucket can hold (burst size)
    /// * `refill_per_second` - Credits restored per second of elapsed time
    ///
    /// # Errors
    /// Returns [`PolicyError`] if `capacity < 1` or `refill_per_second <= 0`,
    /// or if either value is not finite.
    pub fn new(capacity: f64, refill_per_second: f64) -> Result<Self, PolicyError> {
        if !capacity.is_finite() || capacity < 1.0 {
            return Err(PolicyError::InvalidCapacity(capacity));
        }
        if !refill_per_second.is_finite() || refill_per_second <= 0.0 {
            return Err(PolicyError::InvalidRefillRate(refill_per_second));
        }
        Ok(Self {
            capacity,
            refill_per_second,
        })
    }

    /// Maximum credits a bucket can hold.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Credits restored per second.
    pub fn refill_per_second(&self) -> f64 {
        self.refill_per_second
    }
}

impl Default for BucketPolicy {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            refill_per_second: DEFAULT_REFILL_PER_SECOND,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_policy() {
        let policy = BucketPolicy::new(50.0, 10.0).unwrap();
        assert_eq!(policy.capacity(), 50.0);
        assert_eq!(policy.refill_per_second(), 10.0);
    }

    #[test]
    fn test_default_policy() {
        let policy = BucketPolicy::default();
        assert_eq!(policy.capacity(), DEFAULT_CAPACITY);
        assert_eq!(policy.refill_per_second(), DEFAULT_REFILL_PER_SECOND);
    }

    #[test]
    fn test_fractional_refill_allowed() {
        let policy = BucketPolicy::new(1.0, 0.05).unwrap();
        assert_eq!(policy.refill_per_second(), 0.05);
    }

    #[test]
    fn test_capacity_below_one_rejected() {
        assert_eq!(
            BucketPolicy::new(0.0, 10.0),
            Err(PolicyError::InvalidCapacity(0.0))
        );
        assert_eq!(
            BucketPolicy::new(0.99, 10.0),
            Err(PolicyError::InvalidCapacity(0.99))
        );
        assert!(BucketPolicy::new(-5.0, 10.0).is_err());
    }

    #[test]
    fn test_non_positive_refill_rejected() {
        assert_eq!(
            BucketPolicy::new(10.0, 0.0),
            Err(PolicyError::InvalidRefillRate(0.0))
        );
        assert!(BucketPolicy::new(10.0, -1.0).is_err());
    }

    #[test]
    fn test_non_finite_values_rejected() {
        assert!(BucketPolicy::new(f64::INFINITY, 10.0).is_err());
        assert!(BucketPolicy::new(f64::NAN, 10.0).is_err());
        assert!(BucketPolicy::new(10.0, f64::INFINITY).is_err());
        assert!(BucketPolicy::new(10.0, f64::NAN).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = BucketPolicy::new(0.0, 1.0).unwrap_err();
        assert_eq!(err.to_string(), "capacity must be a finite number >= 1, got 0");
    }
}
