//! Aggregator configuration

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::DEFAULT_CHANNEL_CAPACITY;

/// Aggregator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Most recent log entries retained
    #[serde(default = "default_log_capacity", rename = "log-capacity")]
    pub log_capacity: usize,

    /// Channel buffer size for aggregator commands
    #[serde(default = "default_channel_buffer", rename = "channel-buffer")]
    pub channel_buffer: usize,

    /// Capacity of the broadcast event feed
    #[serde(default = "default_event_capacity", rename = "event-capacity")]
    pub event_capacity: usize,
}

fn default_log_capacity() -> usize {
    debug!("default_log_capacity: called");
    1000
}

fn default_channel_buffer() -> usize {
    debug!("default_channel_buffer: called");
    1024
}

fn default_event_capacity() -> usize {
    debug!("default_event_capacity: called");
    DEFAULT_CHANNEL_CAPACITY
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        debug!("AggregatorConfig::default: called");
        Self {
            log_capacity: 1000,
            channel_buffer: 1024,
            event_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AggregatorConfig::default();
        assert_eq!(config.log_capacity, 1000);
        assert_eq!(config.channel_buffer, 1024);
        assert_eq!(config.event_capacity, 4096);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: AggregatorConfig = serde_yaml::from_str("log-capacity: 50").unwrap();
        assert_eq!(config.log_capacity, 50);
        assert_eq!(config.channel_buffer, 1024);
    }
}
