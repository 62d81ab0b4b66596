//! Periodic removal of idle client buckets.
//!
//! Buckets that have refilled to capacity carry no information, so the
//! sweeper drops them at a fixed interval to keep long-running processes from
//! accumulating one entry per client ever seen.

use crate::application::limiter::Limiter;
use crate::application::ports::Storage;
use crate::application::registry::ClientState;
use crate::domain::client::ClientId;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Error returned when sweeper configuration validation fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SweeperConfigError {
    /// Sweep interval duration must be greater than zero
    #[error("sweep interval must be greater than 0")]
    ZeroSweepInterval,
}

/// Error returned when stopping the sweeper fails.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The background task panicked or was aborted.
    #[error("sweeper task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// Configuration for the idle sweep.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// How often to sweep
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

impl SweeperConfig {
    /// Create a new sweeper config with the specified interval.
    ///
    /// # Errors
    /// Returns `SweeperConfigError::ZeroSweepInterval` if `interval` is zero.
    pub fn new(interval: Duration) -> Result<Self, SweeperConfigError> {
        if interval.is_zero() {
            return Err(SweeperConfigError::ZeroSweepInterval);
        }
        Ok(Self { interval })
    }
}

/// Sweeps a set of limiters.
pub struct IdleSweeper<S>
where
    S: Storage<ClientId, ClientState> + Clone,
{
    limiters: Vec<Limiter<S>>,
    config: SweeperConfig,
}

impl<S> IdleSweeper<S>
where
    S: Storage<ClientId, ClientState> + Clone,
{
    /// Create a sweeper over `limiters`.
    pub fn new(limiters: Vec<Limiter<S>>, config: SweeperConfig) -> Self {
        Self { limiters, config }
    }

    /// Sweep every limiter once and return the total number of removed buckets.
    pub fn sweep_once(&self) -> usize {
        let mut total = 0;
        for limiter in &self.limiters {
            let removed = limiter.sweep_idle();
            if removed > 0 {
                tracing::debug!(
                    route = limiter.name(),
                    removed,
                    remaining = limiter.client_count(),
                    "swept idle clients"
                );
            }
            total += removed;
        }
        total
    }

    /// Get the sweeper configuration.
    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// Run [`sweep_once`](Self::sweep_once) every interval on a tokio task.
    ///
    /// The first sweep happens one full interval after start. The task runs
    /// until [`SweeperHandle::shutdown`] is called.
    pub fn start(self) -> SweeperHandle
    where
        S: Send + Sync + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let removed = self.sweep_once();
                        if removed > 0 {
                            tracing::info!(removed, "idle client sweep complete");
                        }
                    }
                }
            }
        });

        SweeperHandle { shutdown_tx, task }
    }
}

/// Handle to a running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for its task to finish.
    ///
    /// # Errors
    /// Returns [`ShutdownError::TaskFailed`] if the task panicked.
    pub async fn shutdown(self) -> Result<(), ShutdownError> {
        // The receiver is gone only if the task already ended; join reports why
        let _ = self.shutdown_tx.send(());
        self.task.await?;
        Ok(())
    }

    /// Check whether the task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
