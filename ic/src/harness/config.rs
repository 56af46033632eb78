//! Harness latency and failure model

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Knobs of the simulated latency and failure model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HarnessConfig {
    /// Lower bound of the random base latency
    #[serde(default = "default_base_latency_min_ms")]
    pub base_latency_min_ms: u64,

    /// Upper bound (inclusive) of the random base latency
    #[serde(default = "default_base_latency_max_ms")]
    pub base_latency_max_ms: u64,

    /// Extra latency per unit of server load
    #[serde(default = "default_ms_per_load")]
    pub ms_per_load: u64,

    /// Failure probability of an idle server
    #[serde(default = "default_base_failure")]
    pub base_failure: f64,

    /// Added failure probability per unit of server load
    #[serde(default = "default_failure_per_load")]
    pub failure_per_load: f64,

    /// How far past the timeout a simulated request may still run
    #[serde(default = "default_timeout_slack_ms")]
    pub timeout_slack_ms: u64,
}

fn default_base_latency_min_ms() -> u64 {
    debug!("default_base_latency_min_ms: called");
    50
}

fn default_base_latency_max_ms() -> u64 {
    debug!("default_base_latency_max_ms: called");
    150
}

fn default_ms_per_load() -> u64 {
    10
}

fn default_base_failure() -> f64 {
    0.1
}

fn default_failure_per_load() -> f64 {
    0.01
}

fn default_timeout_slack_ms() -> u64 {
    100
}

impl Default for HarnessConfig {
    fn default() -> Self {
        debug!("HarnessConfig::default: called");
        Self {
            base_latency_min_ms: default_base_latency_min_ms(),
            base_latency_max_ms: default_base_latency_max_ms(),
            ms_per_load: default_ms_per_load(),
            base_failure: default_base_failure(),
            failure_per_load: default_failure_per_load(),
            timeout_slack_ms: default_timeout_slack_ms(),
        }
    }
}

impl HarnessConfig {
    /// Failure probability for a server at `load`, capped at 1
    pub fn failure_probability(&self, load: u32) -> f64 {
        (self.base_failure + f64::from(load) * self.failure_per_load).min(1.0)
    }

    /// Number of distinct base latencies
    pub fn base_latency_span(&self) -> usize {
        (self.base_latency_max_ms.saturating_sub(self.base_latency_min_ms) + 1) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_probability_grows_with_load() {
        let config = HarnessConfig::default();
        assert!((config.failure_probability(0) - 0.1).abs() < 1e-9);
        assert!((config.failure_probability(5) - 0.15).abs() < 1e-9);
        assert_eq!(config.failure_probability(1000), 1.0);
    }

    #[test]
    fn test_latency_span() {
        assert_eq!(HarnessConfig::default().base_latency_span(), 101);
        let degenerate = HarnessConfig {
            base_latency_min_ms: 200,
            base_latency_max_ms: 100,
            ..Default::default()
        };
        assert_eq!(degenerate.base_latency_span(), 1);
    }
}
