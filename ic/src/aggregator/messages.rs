//! Message types for the aggregator actor

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::domain::{LogEntry, LogFilter, LogLevel};

/// Accumulated system counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SystemStats {
    pub total_requests: u64,
    pub vip_requests: u64,
    pub failed_requests: u64,
    pub timeouts: u64,
    /// Fluctuating throughput gauge, never below zero
    pub requests_per_minute: u64,
    /// Ticks since start
    pub uptime: u64,
    /// Ordering counter advanced once per tick
    pub logical_clock: u64,
    pub critical_section_active: bool,
}

impl SystemStats {
    /// Merge the fields present in `update`
    pub fn apply(&mut self, update: &StatsUpdate) {
        if let Some(n) = update.total_requests {
            self.total_requests = self.total_requests.saturating_add(n);
        }
        if let Some(n) = update.vip_requests {
            self.vip_requests = self.vip_requests.saturating_add(n);
        }
        if let Some(n) = update.failed_requests {
            self.failed_requests = self.failed_requests.saturating_add(n);
        }
        if let Some(n) = update.timeouts {
            self.timeouts = self.timeouts.saturating_add(n);
        }
        if let Some(delta) = update.requests_per_minute {
            self.requests_per_minute = self.requests_per_minute.saturating_add_signed(delta);
        }
        if let Some(active) = update.critical_section_active {
            self.critical_section_active = active;
        }
    }

    /// Advance the logical clock and uptime by one
    pub fn tick(&mut self) {
        self.logical_clock += 1;
        self.uptime += 1;
    }
}

/// Partial stats update; absent fields are left alone
///
/// Counter fields are increments, so counters can only grow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsUpdate {
    pub total_requests: Option<u64>,
    pub vip_requests: Option<u64>,
    pub failed_requests: Option<u64>,
    pub timeouts: Option<u64>,
    /// Signed adjustment, floored at zero
    pub requests_per_minute: Option<i64>,
    pub critical_section_active: Option<bool>,
}

impl StatsUpdate {
    pub fn requests(mut self, n: u64) -> Self {
        self.total_requests = Some(n);
        self
    }

    pub fn vip(mut self, n: u64) -> Self {
        self.vip_requests = Some(n);
        self
    }

    pub fn failures(mut self, n: u64) -> Self {
        self.failed_requests = Some(n);
        self
    }

    pub fn timeouts(mut self, n: u64) -> Self {
        self.timeouts = Some(n);
        self
    }

    pub fn rpm_delta(mut self, delta: i64) -> Self {
        self.requests_per_minute = Some(delta);
        self
    }

    pub fn critical_section(mut self, active: bool) -> Self {
        self.critical_section_active = Some(active);
        self
    }
}

/// Commands accepted by the aggregator task
#[derive(Debug)]
pub enum AggregatorRequest {
    /// Append a log entry
    Record {
        level: LogLevel,
        component: String,
        message: String,
    },

    /// Merge a partial stats update
    UpdateStats { update: StatsUpdate },

    /// Advance the logical clock
    Tick,

    /// Drop every retained log entry
    ClearLogs,

    /// Read the counters
    GetStats { reply_tx: oneshot::Sender<SystemStats> },

    /// Read retained entries matching a filter
    GetLogs {
        filter: LogFilter,
        reply_tx: oneshot::Sender<Vec<LogEntry>>,
    },

    /// Stop the aggregator
    Shutdown,
}
