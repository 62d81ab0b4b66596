//! Server configuration.
//!
//! Compile-time defaults live here as constants. Runtime values come from
//! command-line flags, each with an environment variable fallback, parsed by
//! [`ServerArgs`].

use crate::application::limiter::DEFAULT_MAX_CLIENTS;
use crate::application::sweeper::SweeperConfig;
use crate::domain::policy::{BucketPolicy, PolicyError, DEFAULT_CAPACITY, DEFAULT_REFILL_PER_SECOND};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::http::LimiterSettings;
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default listen address (all interfaces).
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5555;

/// Default seconds between idle bucket sweeps.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Default size of the database connection pool.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Log filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "query_gate=info,tower_http=info";

/// Error returned when the parsed arguments are unusable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Port 0 would bind a random port
    #[error("port must be > 0")]
    ZeroPort,
    /// Burst or refill rate out of range
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// Command-line arguments of the `query-gate` binary.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "query-gate",
    about = "HTTP gateway serving fixed PostgreSQL queries as JSON"
)]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(long, env = "HOST", default_value_t = DEFAULT_HOST)]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Bucket capacity: requests a client may burst per route
    #[arg(long, env = "RATE_LIMIT_BURST", default_value_t = DEFAULT_CAPACITY)]
    pub burst: f64,

    /// Credits restored to each bucket per second
    #[arg(long, env = "RATE_LIMIT_PER_SECOND", default_value_t = DEFAULT_REFILL_PER_SECOND)]
    pub per_second: f64,

    /// Clients tracked per route before LRU eviction (0 = unlimited)
    #[arg(long, env = "RATE_LIMIT_MAX_CLIENTS", default_value_t = DEFAULT_MAX_CLIENTS)]
    pub max_clients: usize,

    /// Idle bucket sweep interval in seconds (0 = disabled)
    #[arg(long, env = "RATE_LIMIT_SWEEP_SECS", default_value_t = DEFAULT_SWEEP_INTERVAL_SECS)]
    pub sweep_interval: u64,

    /// PostgreSQL connection URL; the standard PG* variables are used when unset
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Maximum pooled database connections
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = DEFAULT_DB_MAX_CONNECTIONS)]
    pub db_max_connections: u32,
}

impl ServerArgs {
    /// Check values clap cannot check on its own.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for a zero port or an invalid bucket policy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        self.policy()?;
        Ok(())
    }

    /// Bucket policy shared by every route.
    pub fn policy(&self) -> Result<BucketPolicy, PolicyError> {
        BucketPolicy::new(self.burst, self.per_second)
    }

    /// Per-route client limit, `None` when unlimited.
    pub fn max_clients(&self) -> Option<usize> {
        (self.max_clients > 0).then_some(self.max_clients)
    }

    /// Sweeper configuration, `None` when sweeping is disabled.
    pub fn sweeper_config(&self) -> Option<SweeperConfig> {
        SweeperConfig::new(Duration::from_secs(self.sweep_interval)).ok()
    }

    /// Settings for the route limiters, on the system clock.
    pub fn limiter_settings(&self) -> Result<LimiterSettings, ConfigError> {
        Ok(LimiterSettings {
            policy: self.policy()?,
            max_clients: self.max_clients(),
            clock: Arc::new(SystemClock::new()),
        })
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
