//! Background cycle
//!
//! Once per interval: advance the logical clock, let the throughput gauge
//! wander, drift server loads, and now and then emit a heartbeat log.
//! Failures here are logged and swallowed so the cycle keeps running.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::aggregator::{AggregatorHandle, StatsUpdate};
use crate::chance::SharedChance;
use crate::error::ControlError;
use crate::pool::{SYSTEM, ServerPool};
use crate::timer::spawn_periodic;

const HEARTBEATS: [&str; 4] = [
    "System heartbeat check completed",
    "Load balancer health check passed",
    "Signal timing synchronization verified",
    "Pedestrian crossing sensors active",
];

/// Longest accepted cycle period
pub const MAX_INTERVAL_MS: u64 = 3_600_000;

/// Background cycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TickerConfig {
    /// Period of the cycle
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Chance per cycle of a heartbeat log entry
    #[serde(default = "default_heartbeat_probability")]
    pub heartbeat_probability: f64,

    /// Largest per-cycle change of the requests-per-minute gauge
    #[serde(default = "default_rpm_jitter")]
    pub rpm_jitter: u32,
}

fn default_interval_ms() -> u64 {
    debug!("default_interval_ms: called");
    1000
}

fn default_heartbeat_probability() -> f64 {
    0.1
}

fn default_rpm_jitter() -> u32 {
    1
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            heartbeat_probability: default_heartbeat_probability(),
            rpm_jitter: default_rpm_jitter(),
        }
    }
}

impl TickerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.clamp(1, MAX_INTERVAL_MS))
    }
}

/// Drives the background cycle against the aggregator and pool
pub struct Ticker {
    config: TickerConfig,
    aggregator: AggregatorHandle,
    pool: Arc<ServerPool>,
    chance: SharedChance,
}

impl Ticker {
    pub fn new(
        config: TickerConfig,
        aggregator: AggregatorHandle,
        pool: Arc<ServerPool>,
        chance: SharedChance,
    ) -> Self {
        Self {
            config,
            aggregator,
            pool,
            chance,
        }
    }

    /// One cycle; returns false once the aggregator is gone
    pub async fn cycle(&self) -> bool {
        match self.aggregator.tick().await {
            Ok(()) => {}
            Err(ControlError::ChannelClosed) => {
                debug!("Ticker::cycle: aggregator closed, stopping");
                return false;
            }
            Err(e) => warn!(error = %e, "Ticker: tick failed"),
        }

        let delta = self.chance.delta(self.config.rpm_jitter);
        if delta != 0
            && let Err(e) = self
                .aggregator
                .update_stats(StatsUpdate::default().rpm_delta(delta))
                .await
        {
            warn!(error = %e, "Ticker: rpm update failed");
        }

        self.pool.drift(&*self.chance);

        if self.chance.hit(self.config.heartbeat_probability) {
            let message = HEARTBEATS[self.chance.pick(HEARTBEATS.len())];
            self.aggregator.info(SYSTEM, message).await;
        }
        true
    }

    /// Run the cycle on its own task until aborted or the aggregator stops
    pub fn spawn(self) -> JoinHandle<()> {
        info!(interval_ms = self.config.interval_ms, "Ticker started");
        let period = self.config.interval();
        let ticker = Arc::new(self);
        spawn_periodic(period, move || {
            let ticker = ticker.clone();
            async move { ticker.cycle().await }
        })
    }
}
