//! Integration tests for admission decisions on a single limiter.

use query_gate::infrastructure::mocks::MockClock;
use query_gate::{Admission, BucketPolicy, ClientId, Limiter};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn limiter(capacity: f64, rate: f64, clock: &MockClock) -> Limiter {
    Limiter::builder()
        .with_policy(BucketPolicy::new(capacity, rate).unwrap())
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap()
}

#[test]
fn test_burst_then_partial_refill() {
    let clock = MockClock::new(Instant::now());
    let limiter = limiter(50.0, 10.0, &clock);
    let client = ClientId::from("1.2.3.4");

    for i in 0..50 {
        assert!(limiter.admit(&client), "call {} should be admitted", i + 1);
    }
    assert!(!limiter.admit(&client), "51st call should be rejected");

    // A different client is unaffected
    assert!(limiter.admit(&ClientId::from("5.6.7.8")));

    // 0.5s at 10/s accrues 5 credits: one for this call, 4 left
    clock.advance(Duration::from_millis(500));
    assert!(limiter.admit(&client));
    for _ in 0..4 {
        assert!(limiter.admit(&client));
    }
    assert!(!limiter.admit(&client));
}

#[test]
fn test_refill_clamped_to_capacity() {
    let clock = MockClock::new(Instant::now());
    let limiter = limiter(3.0, 10.0, &clock);
    let client = ClientId::from("1.2.3.4");

    assert!(limiter.admit(&client));

    // An hour of idle time still yields only `capacity` credits
    clock.advance(Duration::from_secs(3600));
    let admitted = (0..10).filter(|_| limiter.admit(&client)).count();
    assert_eq!(admitted, 3);
}

#[test]
fn test_draining_one_client_leaves_others_alone() {
    let clock = MockClock::new(Instant::now());
    let limiter = limiter(5.0, 1.0, &clock);
    let a = ClientId::from("10.0.0.1");
    let b = ClientId::from("10.0.0.2");

    while limiter.admit(&a) {}

    let admitted = (0..5).filter(|_| limiter.admit(&b)).count();
    assert_eq!(admitted, 5);
}

#[test]
fn test_decisions_are_deterministic() {
    let start = Instant::now();
    let run = || {
        let clock = MockClock::new(start);
        let limiter = limiter(4.0, 2.0, &clock);
        let client = ClientId::from("1.2.3.4");
        let mut decisions = Vec::new();
        for step in 0..30u64 {
            clock.set(start + Duration::from_millis(step * 130));
            decisions.push(limiter.check(&client));
            decisions.push(limiter.check(&client));
        }
        decisions
    };

    assert_eq!(run(), run());
}

#[test]
fn test_retry_after_matches_missing_credit() {
    let clock = MockClock::new(Instant::now());
    let limiter = limiter(1.0, 10.0, &clock);
    let client = ClientId::from("1.2.3.4");

    assert_eq!(limiter.check(&client), Admission::Admit);
    clock.advance(Duration::from_millis(40));

    match limiter.check(&client) {
        Admission::Reject { retry_after } => {
            let secs = retry_after.as_secs_f64();
            assert!((secs - 0.06).abs() < 1e-3, "got {:?}", retry_after);
        }
        Admission::Admit => panic!("bucket should be empty"),
    }

    clock.advance(Duration::from_millis(61));
    assert_eq!(limiter.check(&client), Admission::Admit);
}

#[test]
fn test_clock_going_backwards_adds_no_credit() {
    let start = Instant::now() + Duration::from_secs(10);
    let clock = MockClock::new(start);
    let limiter = limiter(1.0, 1.0, &clock);
    let client = ClientId::from("1.2.3.4");

    assert!(limiter.admit(&client));
    clock.set(start - Duration::from_secs(5));
    assert!(!limiter.admit(&client));

    clock.set(start + Duration::from_secs(1));
    assert!(limiter.admit(&client));
}

#[test]
fn test_mapped_ipv6_shares_bucket_with_ipv4() {
    let clock = MockClock::new(Instant::now());
    let limiter = limiter(1.0, 1.0, &clock);

    let v4 = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1));
    let mapped = IpAddr::V6(Ipv4Addr::new(192, 0, 2, 1).to_ipv6_mapped());

    assert!(limiter.admit(&ClientId::from_ip(v4)));
    assert!(!limiter.admit(&ClientId::from_ip(mapped)));

    // A genuine IPv6 client is distinct
    assert!(limiter.admit(&ClientId::from_ip(IpAddr::V6(Ipv6Addr::LOCALHOST))));
}

#[test]
fn test_metrics_count_every_decision() {
    let clock = MockClock::new(Instant::now());
    let limiter = limiter(2.0, 1.0, &clock);
    let client = ClientId::from("1.2.3.4");

    for _ in 0..5 {
        limiter.admit(&client);
    }

    let snapshot = limiter.metrics().snapshot();
    assert_eq!(snapshot.total_requests(), 5);
    assert_eq!(snapshot.requests_admitted, 2);
    assert_eq!(snapshot.requests_rejected, 3);
    assert!((snapshot.rejection_rate() - 0.6).abs() < f64::EPSILON);
}

#[test]
fn test_vanishing_refill_rate_rejects_without_panicking() {
    let clock = MockClock::new(Instant::now());
    let limiter = limiter(1.0, 1e-20, &clock);
    let client = ClientId::from("1.2.3.4");

    assert!(limiter.admit(&client));
    assert_eq!(
        limiter.check(&client),
        Admission::Reject {
            retry_after: Duration::MAX
        }
    );
}
