//! Intersect configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::aggregator::AggregatorConfig;
use crate::coordinator::{CoordinatorConfig, MAX_AUTO_INTERVAL_SECS};
use crate::harness::HarnessConfig;
use crate::pool::PoolConfig;
use crate::ticker::{MAX_INTERVAL_MS, TickerConfig};

const APP_NAME: &str = "intersect";
const LOCAL_CONFIG: &str = ".intersect.yml";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Signal sequencing, failure injection, and auto-generation
    pub coordinator: CoordinatorConfig,

    /// Simulated servers
    pub pool: PoolConfig,

    /// Load test latency and failure model
    pub harness: HarnessConfig,

    /// Log ring and event feed sizing
    pub aggregator: AggregatorConfig,

    /// Background cycle
    pub ticker: TickerConfig,

    /// Seed for reproducible randomness; unset draws from the OS
    pub seed: Option<u64>,

    /// Process log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Reject values the components cannot run with
    pub fn validate(&self) -> Result<()> {
        debug!("Config::validate: called");
        let probabilities = [
            ("coordinator.failure-probability", self.coordinator.failure_probability),
            ("coordinator.auto-burst-probability", self.coordinator.auto_burst_probability),
            ("pool.drift-probability", self.pool.drift_probability),
            ("harness.base-failure", self.harness.base_failure),
            ("ticker.heartbeat-probability", self.ticker.heartbeat_probability),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(eyre::eyre!("{} must be between 0 and 1, got {}", name, p));
            }
        }
        if !(1..=MAX_AUTO_INTERVAL_SECS).contains(&self.coordinator.auto_interval_secs) {
            return Err(eyre::eyre!(
                "coordinator.auto-interval-secs must be between 1 and {}, got {}",
                MAX_AUTO_INTERVAL_SECS,
                self.coordinator.auto_interval_secs
            ));
        }
        if !(1..=MAX_INTERVAL_MS).contains(&self.ticker.interval_ms) {
            return Err(eyre::eyre!(
                "ticker.interval-ms must be between 1 and {}, got {}",
                MAX_INTERVAL_MS,
                self.ticker.interval_ms
            ));
        }
        if self.pool.servers.is_empty() {
            return Err(eyre::eyre!("pool.servers must name at least one server"));
        }
        Ok(())
    }

    /// Candidate config files in priority order, excluding an explicit path
    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join(APP_NAME).join(format!("{APP_NAME}.yml")));
        }
        paths
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // An explicit path must load
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // ./.intersect.yml, then ~/.config/intersect/intersect.yml
        for candidate in Self::search_paths() {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the `log-level` key, before logging is set up
    ///
    /// Any failure yields `None`; the full load reports it later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => Self::search_paths(),
        };
        candidates
            .into_iter()
            .find(|p| p.exists())
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate().context("Invalid config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.coordinator.regular.green_ms, 5000);
        assert_eq!(config.aggregator.log_capacity, 1000);
        assert_eq!(config.pool.servers.len(), 3);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
seed: 42
log-level: debug
coordinator:
  failure-probability: 0.0
  vip:
    rise-ms: 1000
    green-ms: 1500
    clear-ms: 1000
pool:
  reconnect-settle-ms: 250
ticker:
  interval-ms: 500
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.coordinator.failure_probability, 0.0);
        assert_eq!(config.coordinator.vip.green_ms, 1500);
        assert_eq!(config.coordinator.regular.green_ms, 5000);
        assert_eq!(config.pool.reconnect_settle_ms, 250);
        assert_eq!(config.ticker.interval_ms, 500);
        assert_eq!(config.harness.base_latency_min_ms, 50);
    }

    #[test]
    fn test_validate_rejects_bad_probability() {
        let mut config = Config::default();
        config.coordinator.failure_probability = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pool.servers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_intervals() {
        let mut config = Config::default();
        config.coordinator.auto_interval_secs = u64::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("auto-interval-secs"));

        let mut config = Config::default();
        config.coordinator.auto_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ticker.interval_ms = u64::MAX;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.coordinator.auto_interval_secs = MAX_AUTO_INTERVAL_SECS;
        config.ticker.interval_ms = MAX_INTERVAL_MS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("intersect.yml");
        fs::write(&path, "log-level: warn\nseed: 7\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("warn"));
    }

    #[test]
    fn test_load_explicit_path_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.yml");
        assert!(Config::load(Some(&missing)).is_err());
        assert!(Config::load_log_level(Some(&missing)).is_none());

        let invalid = dir.path().join("invalid.yml");
        fs::write(&invalid, "coordinator:\n  failure-probability: 3.0\n").unwrap();
        assert!(Config::load(Some(&invalid)).is_err());
    }
}
