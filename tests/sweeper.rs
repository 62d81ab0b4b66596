//! Integration tests for the background idle sweep.

use query_gate::infrastructure::http::{LimiterSettings, RouteLimiters};
use query_gate::infrastructure::mocks::MockClock;
use query_gate::{BucketPolicy, ClientId, IdleSweeper, SweeperConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn route_limiters(clock: &MockClock) -> RouteLimiters {
    RouteLimiters::build(&LimiterSettings {
        policy: BucketPolicy::new(5.0, 1.0).unwrap(),
        max_clients: None,
        clock: Arc::new(clock.clone()),
    })
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_cleans_every_route() {
    let clock = MockClock::new(Instant::now());
    let limiters = route_limiters(&clock);
    let client = ClientId::from("192.0.2.1");

    for limiter in limiters.limiters() {
        assert!(limiter.admit(&client));
    }

    let config = SweeperConfig::new(Duration::from_secs(1)).unwrap();
    let handle = IdleSweeper::new(limiters.limiters(), config).start();

    // Not yet refilled: nothing may be removed
    tokio::time::sleep(Duration::from_millis(1500)).await;
    for limiter in limiters.limiters() {
        assert_eq!(limiter.client_count(), 1);
    }

    clock.advance(Duration::from_secs(1));
    tokio::time::sleep(Duration::from_secs(1)).await;
    for limiter in limiters.limiters() {
        assert_eq!(limiter.client_count(), 0, "route {}", limiter.name());
        assert_eq!(limiter.metrics().clients_swept(), 1);
    }

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_sweeping() {
    let clock = MockClock::new(Instant::now());
    let limiters = route_limiters(&clock);
    let (_, poi) = limiters
        .iter()
        .find(|(route, _)| route.path == "/poi")
        .unwrap();
    let poi = poi.clone();

    let config = SweeperConfig::new(Duration::from_millis(100)).unwrap();
    let handle = IdleSweeper::new(limiters.limiters(), config).start();
    assert!(!handle.is_finished());
    handle.shutdown().await.unwrap();

    poi.admit(&ClientId::from("192.0.2.1"));
    clock.advance(Duration::from_secs(10));
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(poi.client_count(), 1);
}
