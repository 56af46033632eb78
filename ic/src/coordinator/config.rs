//! Coordinator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Longest accepted gap between auto-generated bursts
pub const MAX_AUTO_INTERVAL_SECS: u64 = 3600;

/// Dwell times of one signal sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceTiming {
    /// Yellow before green (t1)
    #[serde(rename = "rise-ms")]
    pub rise_ms: u64,

    /// Green hold (t2)
    #[serde(rename = "green-ms")]
    pub green_ms: u64,

    /// Yellow before red (t3)
    #[serde(rename = "clear-ms")]
    pub clear_ms: u64,
}

impl SequenceTiming {
    pub const fn regular() -> Self {
        Self {
            rise_ms: 2000,
            green_ms: 5000,
            clear_ms: 2000,
        }
    }

    /// VIP traffic holds green for a shorter, expedited window
    pub const fn vip() -> Self {
        Self {
            rise_ms: 2000,
            green_ms: 3000,
            clear_ms: 2000,
        }
    }

    pub fn rise(&self) -> Duration {
        Duration::from_millis(self.rise_ms)
    }

    pub fn green(&self) -> Duration {
        Duration::from_millis(self.green_ms)
    }

    pub fn clear(&self) -> Duration {
        Duration::from_millis(self.clear_ms)
    }

    /// Full Red-to-Red duration
    pub fn total(&self) -> Duration {
        self.rise() + self.green() + self.clear()
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Timing of regular sequences
    #[serde(default = "default_regular")]
    pub regular: SequenceTiming,

    /// Timing of VIP sequences
    #[serde(default = "default_vip")]
    pub vip: SequenceTiming,

    /// Probability that a request is rejected upstream before reaching the section
    #[serde(default = "default_failure_probability", rename = "failure-probability")]
    pub failure_probability: f64,

    /// Channel buffer size for coordinator requests
    #[serde(default = "default_channel_buffer", rename = "channel-buffer")]
    pub channel_buffer: usize,

    /// Seconds between auto-generated request bursts
    #[serde(default = "default_auto_interval_secs", rename = "auto-interval-secs")]
    pub auto_interval_secs: u64,

    /// Probability that an auto-generated burst carries two requests instead of one
    #[serde(default = "default_auto_burst_probability", rename = "auto-burst-probability")]
    pub auto_burst_probability: f64,

    /// Gap between requests within one burst
    #[serde(default = "default_auto_stagger_ms", rename = "auto-stagger-ms")]
    pub auto_stagger_ms: u64,
}

fn default_regular() -> SequenceTiming {
    SequenceTiming::regular()
}

fn default_vip() -> SequenceTiming {
    SequenceTiming::vip()
}

fn default_failure_probability() -> f64 {
    debug!("default_failure_probability: called");
    0.1
}

fn default_channel_buffer() -> usize {
    debug!("default_channel_buffer: called");
    256
}

fn default_auto_interval_secs() -> u64 {
    debug!("default_auto_interval_secs: called");
    4
}

fn default_auto_burst_probability() -> f64 {
    0.3
}

fn default_auto_stagger_ms() -> u64 {
    500
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        debug!("CoordinatorConfig::default: called");
        Self {
            regular: SequenceTiming::regular(),
            vip: SequenceTiming::vip(),
            failure_probability: 0.1,
            channel_buffer: 256,
            auto_interval_secs: 4,
            auto_burst_probability: 0.3,
            auto_stagger_ms: 500,
        }
    }
}

impl CoordinatorConfig {
    /// Timing for a regular or VIP sequence
    pub fn timing(&self, vip: bool) -> &SequenceTiming {
        if vip { &self.vip } else { &self.regular }
    }

    pub fn auto_stagger(&self) -> Duration {
        Duration::from_millis(self.auto_stagger_ms)
    }
}
