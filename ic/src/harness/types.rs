//! Load test configuration, outcomes, and summary statistics
//!
//! Field names serialize in camelCase so exported reports keep the layout
//! existing dashboards read.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};

/// What each simulated request stands for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    #[default]
    SignalStatus,
    VipRequest,
    /// Each request is a signal-status or VIP request with equal odds
    Mixed,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RequestKind::SignalStatus => "signal_status",
            RequestKind::VipRequest => "vip_request",
            RequestKind::Mixed => "mixed",
        };
        f.write_str(label)
    }
}

impl FromStr for RequestKind {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "signal_status" | "status" => Ok(RequestKind::SignalStatus),
            "vip_request" | "vip" => Ok(RequestKind::VipRequest),
            "mixed" => Ok(RequestKind::Mixed),
            other => Err(ControlError::InvalidConfig(format!("unknown request kind '{other}'"))),
        }
    }
}

/// Parameters of one load test run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadTestConfig {
    pub concurrency: u32,
    pub timeout_ms: u64,
    pub request_kind: RequestKind,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            concurrency: 15,
            timeout_ms: 5000,
            request_kind: RequestKind::SignalStatus,
        }
    }
}

impl LoadTestConfig {
    pub const CONCURRENCY_RANGE: std::ops::RangeInclusive<u32> = 1..=100;
    pub const TIMEOUT_RANGE_MS: std::ops::RangeInclusive<u64> = 1000..=30000;

    pub fn new(concurrency: u32, timeout_ms: u64, request_kind: RequestKind) -> Self {
        Self {
            concurrency,
            timeout_ms,
            request_kind,
        }
    }

    pub fn validate(&self) -> ControlResult<()> {
        if !Self::CONCURRENCY_RANGE.contains(&self.concurrency) {
            return Err(ControlError::InvalidConfig(format!(
                "concurrency must be between 1 and 100, got {}",
                self.concurrency
            )));
        }
        if !Self::TIMEOUT_RANGE_MS.contains(&self.timeout_ms) {
            return Err(ControlError::InvalidConfig(format!(
                "timeout must be between 1000 and 30000 ms, got {}",
                self.timeout_ms
            )));
        }
        Ok(())
    }
}

/// How a simulated request resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Success,
    Failure,
    Timeout,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::Success => f.write_str("SUCCESS"),
            RequestStatus::Failure => f.write_str("FAILURE"),
            RequestStatus::Timeout => f.write_str("TIMEOUT"),
        }
    }
}

/// Exactly one per issued request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOutcome {
    /// 1-based position in the batch
    pub request_id: u32,
    /// Resolved kind; never `Mixed`
    pub kind: RequestKind,
    pub status: RequestStatus,
    pub latency_ms: u64,
    pub server_id: String,
}

/// Server id recorded for requests that never reached a server
pub const UNKNOWN_SERVER: &str = "unknown";

/// Summary of a finished run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStats {
    pub total_requests: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub timeout_count: usize,
    pub vip_count: usize,
    /// Percentages, 0..=100
    pub success_rate: f64,
    pub failure_rate: f64,
    pub timeout_rate: f64,
    pub average_latency_ms: f64,
    pub requests_per_second: f64,
    pub duration_secs: f64,
    /// 0 when fewer than two servers were used
    pub load_balancing_effectiveness: f64,
    /// Requests per server that actually handled them; unreachable requests are left out
    pub server_distribution: BTreeMap<String, usize>,
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Aggregate outcomes of a run that took `duration`
pub fn summarize(results: &[RequestOutcome], duration: Duration) -> TestStats {
    let total = results.len();
    let count = |status: RequestStatus| results.iter().filter(|r| r.status == status).count();
    let success_count = count(RequestStatus::Success);
    let failure_count = count(RequestStatus::Failure);
    let timeout_count = count(RequestStatus::Timeout);

    let mut server_distribution: BTreeMap<String, usize> = BTreeMap::new();
    for r in results.iter().filter(|r| r.server_id != UNKNOWN_SERVER) {
        *server_distribution.entry(r.server_id.clone()).or_default() += 1;
    }

    let load_balancing_effectiveness = if server_distribution.len() > 1 {
        let served: usize = server_distribution.values().sum();
        let max = server_distribution.values().copied().max().unwrap_or(0);
        (1.0 - max as f64 / served as f64) * 100.0
    } else {
        0.0
    };

    let average_latency_ms = if total == 0 {
        0.0
    } else {
        results.iter().map(|r| r.latency_ms as f64).sum::<f64>() / total as f64
    };

    let duration_secs = duration.as_secs_f64();
    let requests_per_second = if duration_secs > 0.0 {
        total as f64 / duration_secs
    } else {
        0.0
    };

    TestStats {
        total_requests: total,
        success_count,
        failure_count,
        timeout_count,
        vip_count: results.iter().filter(|r| r.kind == RequestKind::VipRequest).count(),
        success_rate: percent(success_count, total),
        failure_rate: percent(failure_count, total),
        timeout_rate: percent(timeout_count, total),
        average_latency_ms,
        requests_per_second,
        duration_secs,
        load_balancing_effectiveness,
        server_distribution,
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    pub run_id: String,
    pub config: LoadTestConfig,
    pub stats: TestStats,
    /// Ordered by request id
    pub results: Vec<RequestOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
