//! LoadHarness implementation

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregator::{AggregatorHandle, StatsUpdate};
use crate::chance::SharedChance;
use crate::error::ControlResult;
use crate::events::{EventBus, IntersectionEvent};
use crate::pool::ServerPool;

use super::config::HarnessConfig;
use super::types::{
    LoadTestConfig, RequestKind, RequestOutcome, RequestStatus, TestReport, UNKNOWN_SERVER, summarize,
};

/// Log component for load test activity
pub const LOAD_TESTING: &str = "Load Testing";

/// Runs load tests against the shared server pool
pub struct LoadHarness {
    config: HarnessConfig,
    pool: Arc<ServerPool>,
    aggregator: AggregatorHandle,
    events: Arc<EventBus>,
    chance: SharedChance,
    last_report: RwLock<Option<TestReport>>,
}

impl LoadHarness {
    pub fn new(
        config: HarnessConfig,
        pool: Arc<ServerPool>,
        aggregator: AggregatorHandle,
        events: Arc<EventBus>,
        chance: SharedChance,
    ) -> Self {
        debug!(?config, "LoadHarness::new: called");
        Self {
            config,
            pool,
            aggregator,
            events,
            chance,
            last_report: RwLock::new(None),
        }
    }

    /// Report of the most recent completed run
    pub fn last_report(&self) -> Option<TestReport> {
        self.last_report
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Issue `config.concurrency` simulated requests and summarize them once all resolve
    pub async fn run(&self, config: LoadTestConfig) -> ControlResult<TestReport> {
        debug!(?config, "LoadHarness::run: called");
        config.validate()?;

        let run_id = Uuid::now_v7().to_string();
        info!(%run_id, concurrency = config.concurrency, kind = %config.request_kind, "Load test started");
        self.aggregator
            .info(
                LOAD_TESTING,
                format!(
                    "Starting load test: {} {} requests, {}ms timeout",
                    config.concurrency, config.request_kind, config.timeout_ms
                ),
            )
            .await;

        let started_at = Utc::now();
        let start = Instant::now();

        let tasks: Vec<_> = (1..=config.concurrency)
            .map(|request_id| {
                let sim = Simulation {
                    config: self.config.clone(),
                    pool: self.pool.clone(),
                    chance: self.chance.clone(),
                    timeout_ms: config.timeout_ms,
                };
                let kind = sim.resolve_kind(config.request_kind);
                (request_id, kind, tokio::spawn(sim.request(request_id, kind)))
            })
            .collect();

        let (meta, handles): (Vec<_>, Vec<_>) = tasks
            .into_iter()
            .map(|(id, kind, handle)| ((id, kind), handle))
            .unzip();

        let mut results: Vec<RequestOutcome> = join_all(handles)
            .await
            .into_iter()
            .zip(meta)
            .map(|(joined, (request_id, kind))| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(request_id, error = %e, "Simulated request task failed");
                    unreachable_outcome(request_id, kind, config.timeout_ms)
                }
            })
            .collect();
        results.sort_by_key(|r| r.request_id);

        let duration = start.elapsed();
        let stats = summarize(&results, duration);
        let report = TestReport {
            run_id: run_id.clone(),
            config,
            stats,
            results,
            started_at,
            finished_at: Utc::now(),
        };

        self.publish(&report).await;
        *self
            .last_report
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(report.clone());
        Ok(report)
    }

    async fn publish(&self, report: &TestReport) {
        let stats = &report.stats;
        info!(
            run_id = %report.run_id,
            successes = stats.success_count,
            total = stats.total_requests,
            duration_secs = stats.duration_secs,
            "Load test completed"
        );

        let update = StatsUpdate::default()
            .requests(stats.total_requests as u64)
            .vip(stats.vip_count as u64)
            .failures(stats.failure_count as u64)
            .timeouts(stats.timeout_count as u64);
        if let Err(e) = self.aggregator.update_stats(update).await {
            warn!(error = %e, "LoadHarness: failed to forward stats");
        }

        self.aggregator
            .info(
                LOAD_TESTING,
                format!(
                    "Load test completed: {}/{} successful requests",
                    stats.success_count, stats.total_requests
                ),
            )
            .await;

        self.events.emit(IntersectionEvent::LoadTestCompleted {
            run_id: report.run_id.clone(),
            total: stats.total_requests,
            successes: stats.success_count,
        });
    }
}

/// Failure recorded for a request that never reached a server
fn unreachable_outcome(request_id: u32, kind: RequestKind, timeout_ms: u64) -> RequestOutcome {
    RequestOutcome {
        request_id,
        kind,
        status: RequestStatus::Failure,
        latency_ms: timeout_ms,
        server_id: UNKNOWN_SERVER.to_string(),
    }
}

/// State one simulated request task needs
struct Simulation {
    config: HarnessConfig,
    pool: Arc<ServerPool>,
    chance: SharedChance,
    timeout_ms: u64,
}

impl Simulation {
    fn resolve_kind(&self, kind: RequestKind) -> RequestKind {
        match kind {
            RequestKind::Mixed if self.chance.hit(0.5) => RequestKind::VipRequest,
            RequestKind::Mixed => RequestKind::SignalStatus,
            other => other,
        }
    }

    /// Simulated latency for a server at `load`, capped just past the timeout
    fn latency_ms(&self, load: u32) -> u64 {
        let base = self.config.base_latency_min_ms + self.chance.pick(self.config.base_latency_span()) as u64;
        let total = base + u64::from(load) * self.config.ms_per_load;
        total.min(self.timeout_ms + self.config.timeout_slack_ms)
    }

    async fn request(self, request_id: u32, kind: RequestKind) -> RequestOutcome {
        let server = match self.pool.select_server(&*self.chance) {
            Ok(server) => server,
            Err(e) => {
                debug!(request_id, error = %e, "Simulation::request: no server");
                return unreachable_outcome(request_id, kind, self.timeout_ms);
            }
        };

        let latency_ms = self.latency_ms(server.load);
        let counted = self.pool.begin_request(&server.id).unwrap_or(false);
        tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        if counted && let Err(e) = self.pool.end_request(&server.id) {
            debug!(request_id, error = %e, "Simulation::request: failed to release load");
        }

        let status = if latency_ms >= self.timeout_ms {
            RequestStatus::Timeout
        } else if self.chance.hit(self.config.failure_probability(server.load)) {
            RequestStatus::Failure
        } else {
            RequestStatus::Success
        };
        debug!(request_id, server = %server.id, latency_ms, %status, "Simulation::request: resolved");

        RequestOutcome {
            request_id,
            kind,
            status,
            latency_ms,
            server_id: server.id,
        }
    }
}
