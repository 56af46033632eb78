//! Intersection facade
//!
//! Wires the aggregator, coordinator, pool, harness, ticker, and clock sync
//! together and exposes the command surface callers use. Every component is
//! an owned task or a shared handle; nothing here is global.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Local, NaiveTime};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::aggregator::{Aggregator, AggregatorHandle, SystemStats};
use crate::chance::{self, SharedChance};
use crate::config::Config;
use crate::coordinator::{Admission, Coordinator, CoordinatorHandle, CoordinatorState, IntersectionSnapshot};
use crate::domain::{LogEntry, LogFilter, ServerNode, SignalId};
use crate::error::ControlResult;
use crate::events::{EventBus, IntersectionEvent, create_event_bus};
use crate::harness::{LoadHarness, LoadTestConfig, TestReport};
use crate::pool::{SYSTEM, ServerPool};
use crate::ticker::Ticker;
use crate::timesync::{ClockSync, TIME_SYNC, format_clock_time};

/// A running intersection controller
pub struct Intersection {
    coordinator: CoordinatorHandle,
    aggregator: AggregatorHandle,
    pool: Arc<ServerPool>,
    harness: LoadHarness,
    clocks: Mutex<ClockSync>,
    events: Arc<EventBus>,
    coordinator_task: JoinHandle<()>,
    aggregator_task: JoinHandle<()>,
    ticker_task: Option<JoinHandle<()>>,
}

impl Intersection {
    /// Start every component with randomness chosen by `config.seed`
    pub fn start(config: &Config) -> Self {
        Self::start_with(config, chance::from_seed(config.seed), true)
    }

    /// Start with an explicit randomness source, optionally without the background cycle
    pub fn start_with(config: &Config, chance: SharedChance, background: bool) -> Self {
        debug!(seed = ?config.seed, background, "Intersection::start_with: called");
        let events = create_event_bus(config.aggregator.event_capacity);

        let aggregator = Aggregator::new(config.aggregator.clone(), events.clone());
        let aggregator_handle = aggregator.handle();
        let aggregator_task = tokio::spawn(aggregator.run());

        let pool = Arc::new(ServerPool::new(config.pool.clone(), aggregator_handle.clone(), events.clone()));

        let coordinator = Coordinator::new(
            config.coordinator.clone(),
            aggregator_handle.clone(),
            events.clone(),
            chance.clone(),
        );
        let coordinator_handle = coordinator.handle();
        let coordinator_task = tokio::spawn(coordinator.run());

        let harness = LoadHarness::new(
            config.harness.clone(),
            pool.clone(),
            aggregator_handle.clone(),
            events.clone(),
            chance.clone(),
        );

        let ticker_task = background.then(|| {
            Ticker::new(config.ticker.clone(), aggregator_handle.clone(), pool.clone(), chance).spawn()
        });

        info!("Intersection started");
        Self {
            coordinator: coordinator_handle,
            aggregator: aggregator_handle,
            pool,
            harness,
            clocks: Mutex::new(ClockSync::new()),
            events,
            coordinator_task,
            aggregator_task,
            ticker_task,
        }
    }

    fn clocks(&self) -> MutexGuard<'_, ClockSync> {
        self.clocks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Signal control

    pub async fn request_signal(&self, signal: SignalId, vip: bool) -> ControlResult<Admission> {
        self.coordinator.request_signal(signal, vip).await
    }

    pub async fn request_signal_named(&self, signal: &str, vip: bool) -> ControlResult<Admission> {
        self.coordinator.request_signal_named(signal, vip).await
    }

    pub async fn toggle_auto_generate(&self) -> ControlResult<bool> {
        self.coordinator.toggle_auto_generate().await
    }

    pub async fn set_auto_interval(&self, secs: u64) -> ControlResult<()> {
        self.coordinator.set_auto_interval(secs).await
    }

    pub async fn snapshot(&self) -> ControlResult<IntersectionSnapshot> {
        self.coordinator.snapshot().await
    }

    pub async fn state(&self) -> ControlResult<CoordinatorState> {
        self.coordinator.state().await
    }

    // Load testing

    pub async fn run_load_test(&self, config: LoadTestConfig) -> ControlResult<TestReport> {
        self.harness.run(config).await
    }

    pub fn last_report(&self) -> Option<TestReport> {
        self.harness.last_report()
    }

    // Servers

    pub fn servers(&self) -> Vec<ServerNode> {
        self.pool.servers()
    }

    pub async fn disconnect_server(&self, id: &str) -> ControlResult<ServerNode> {
        self.pool.disconnect(id).await
    }

    pub async fn reconnect_server(&self, id: &str) -> ControlResult<ServerNode> {
        self.pool.reconnect(id).await
    }

    // Clocks

    /// Register a client's `HH:MM:SS` reading; invalid input changes nothing
    pub async fn register_client_time(&self, client_id: &str, time: &str) -> ControlResult<NaiveTime> {
        let parsed = self.clocks().register_client_time(client_id, time)?;
        self.aggregator
            .info(TIME_SYNC, format!("Registered time for {client_id}: {}", format_clock_time(parsed)))
            .await;
        Ok(parsed)
    }

    pub async fn set_server_time(&self, time: &str) -> ControlResult<NaiveTime> {
        let parsed = self.clocks().set_server_time(time)?;
        self.aggregator
            .info(TIME_SYNC, format!("Server time set to {}", format_clock_time(parsed)))
            .await;
        Ok(parsed)
    }

    /// Berkeley-average the server and client readings
    pub async fn synchronize_clocks(&self) -> NaiveTime {
        let agreed = self.clocks().synchronize(Local::now().time());
        self.aggregator
            .info(
                TIME_SYNC,
                format!(
                    "Berkeley synchronization completed. Synchronized time: {}",
                    format_clock_time(agreed)
                ),
            )
            .await;
        agreed
    }

    pub fn synchronized_time(&self) -> Option<NaiveTime> {
        self.clocks().synchronized_time()
    }

    pub fn clock_sync(&self) -> ClockSync {
        self.clocks().clone()
    }

    // Logs and stats

    pub async fn stats(&self) -> ControlResult<SystemStats> {
        self.aggregator.stats().await
    }

    pub async fn logs(&self, filter: LogFilter) -> ControlResult<Vec<LogEntry>> {
        self.aggregator.logs(filter).await
    }

    pub async fn clear_logs(&self) -> ControlResult<()> {
        self.aggregator.clear_logs().await
    }

    /// Feed of everything that happens from now on
    pub fn subscribe(&self) -> broadcast::Receiver<IntersectionEvent> {
        self.events.subscribe()
    }

    /// Stop every task, revoking pending timers
    pub async fn shutdown(self) -> ControlResult<()> {
        debug!("Intersection::shutdown: called");
        if let Some(ticker) = &self.ticker_task {
            ticker.abort();
        }

        self.aggregator.info(SYSTEM, "Intersection shutting down").await;
        self.coordinator.shutdown().await?;
        if let Err(e) = self.coordinator_task.await {
            warn!(error = %e, "Coordinator task ended abnormally");
        }

        self.aggregator.shutdown().await?;
        if let Err(e) = self.aggregator_task.await {
            warn!(error = %e, "Aggregator task ended abnormally");
        }

        info!("Intersection stopped");
        Ok(())
    }
}
