//! Aggregator task implementation

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::domain::LogEntry;
use crate::events::{EventBus, IntersectionEvent};

use super::buffer::LogBuffer;
use super::config::AggregatorConfig;
use super::handle::AggregatorHandle;
use super::messages::{AggregatorRequest, SystemStats};

/// Owner of the log ring and the system counters
pub struct Aggregator {
    config: AggregatorConfig,
    tx: mpsc::Sender<AggregatorRequest>,
    rx: mpsc::Receiver<AggregatorRequest>,
    events: Arc<EventBus>,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig, events: Arc<EventBus>) -> Self {
        debug!(?config, "Aggregator::new: called");
        let (tx, rx) = mpsc::channel(config.channel_buffer.max(1));
        Self { config, tx, rx, events }
    }

    /// Handle for sending commands to this aggregator
    pub fn handle(&self) -> AggregatorHandle {
        AggregatorHandle::new(self.tx.clone())
    }

    /// Run the aggregator task until shutdown is requested
    pub async fn run(mut self) {
        let mut logs = LogBuffer::new(self.config.log_capacity);
        let mut stats = SystemStats::default();
        let mut next_id: u64 = 1;

        info!(capacity = logs.capacity(), "Aggregator started");

        while let Some(req) = self.rx.recv().await {
            match req {
                AggregatorRequest::Record {
                    level,
                    component,
                    message,
                } => {
                    let entry = LogEntry {
                        id: next_id,
                        timestamp: Utc::now(),
                        level,
                        component,
                        message,
                    };
                    next_id += 1;
                    debug!(id = entry.id, %level, component = %entry.component, "Recording log entry");
                    if let Some(evicted) = logs.push(entry.clone()) {
                        debug!(evicted_id = evicted.id, "Evicted oldest log entry");
                    }
                    self.events.emit(IntersectionEvent::LogRecorded { entry });
                }

                AggregatorRequest::UpdateStats { update } => {
                    debug!(?update, "Applying stats update");
                    stats.apply(&update);
                }

                AggregatorRequest::Tick => {
                    stats.tick();
                }

                AggregatorRequest::ClearLogs => {
                    debug!(cleared = logs.len(), "Clearing logs");
                    logs.clear();
                }

                AggregatorRequest::GetStats { reply_tx } => {
                    let _ = reply_tx.send(stats.clone());
                }

                AggregatorRequest::GetLogs { filter, reply_tx } => {
                    let _ = reply_tx.send(logs.filtered(&filter));
                }

                AggregatorRequest::Shutdown => {
                    info!("Aggregator shutting down");
                    break;
                }
            }
        }

        info!("Aggregator stopped");
    }
}
