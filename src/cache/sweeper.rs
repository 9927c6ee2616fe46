//! Expired Row Sweeper
//!
//! Background job deleting database rows past their expiry. Reads never
//! delete expired rows, so without the sweeper they accumulate.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::manager::ProductCache;

/// Periodic `sweep_expired` runner
pub struct CacheSweeper {
    cache: Arc<ProductCache>,
    period: Duration,
    shutdown: CancellationToken,
}

impl CacheSweeper {
    /// Sweep every `sweep_interval_secs` of the cache's configuration.
    pub fn new(cache: Arc<ProductCache>) -> Self {
        let period = cache.config().sweep_interval();
        Self::with_interval(cache, period)
    }

    pub fn with_interval(cache: Arc<ProductCache>, period: Duration) -> Self {
        Self {
            cache,
            period: period.max(Duration::from_millis(1)),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops the loop when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run until the shutdown token is cancelled. The first sweep is immediate.
    ///
    /// Returns the number of sweeps performed.
    #[instrument(skip(self), fields(period = ?self.period))]
    pub async fn run(self) -> u64 {
        info!("Starting expired row sweeper");

        let mut tick = interval(self.period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sweeps = 0;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!(sweeps, "Expired row sweeper shutting down");
                    break;
                }

                _ = tick.tick() => {
                    let rows = self.cache.sweep_expired().await;
                    sweeps += 1;
                    debug!(rows, "Sweep finished");
                }
            }
        }

        sweeps
    }

    /// Run on a new task.
    pub fn spawn(self) -> (CancellationToken, JoinHandle<u64>) {
        let token = self.shutdown_token();
        (token, tokio::spawn(self.run()))
    }
}
