//! Server pool configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::domain::{ServerNode, default_servers};

/// Server pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Nodes in the pool, in display order
    #[serde(default = "default_servers")]
    pub servers: Vec<ServerNode>,

    /// Delay between a reconnect attempt and the node coming back
    #[serde(default = "default_reconnect_settle_ms", rename = "reconnect-settle-ms")]
    pub reconnect_settle_ms: u64,

    /// Chance per drift call that backend loads move at all
    #[serde(default = "default_drift_probability", rename = "drift-probability")]
    pub drift_probability: f64,

    /// Largest load change a single drift applies to one node
    #[serde(default = "default_drift_delta", rename = "drift-delta")]
    pub drift_delta: u32,
}

fn default_reconnect_settle_ms() -> u64 {
    debug!("default_reconnect_settle_ms: called");
    2000
}

fn default_drift_probability() -> f64 {
    0.3
}

fn default_drift_delta() -> u32 {
    1
}

impl Default for PoolConfig {
    fn default() -> Self {
        debug!("PoolConfig::default: called");
        Self {
            servers: default_servers(),
            reconnect_settle_ms: default_reconnect_settle_ms(),
            drift_probability: default_drift_probability(),
            drift_delta: default_drift_delta(),
        }
    }
}

impl PoolConfig {
    pub fn reconnect_settle(&self) -> Duration {
        Duration::from_millis(self.reconnect_settle_ms)
    }
}
