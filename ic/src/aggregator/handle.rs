//! AggregatorHandle - client interface for recording logs and stats

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::domain::{LogEntry, LogFilter, LogLevel};
use crate::error::{ControlError, ControlResult};

use super::messages::{AggregatorRequest, StatsUpdate, SystemStats};

/// Cloneable handle to the aggregator task
#[derive(Clone)]
pub struct AggregatorHandle {
    tx: mpsc::Sender<AggregatorRequest>,
}

impl AggregatorHandle {
    pub(crate) fn new(tx: mpsc::Sender<AggregatorRequest>) -> Self {
        Self { tx }
    }

    async fn send(&self, req: AggregatorRequest) -> ControlResult<()> {
        self.tx.send(req).await.map_err(|_| ControlError::ChannelClosed)
    }

    /// Append a log entry
    ///
    /// Logging never fails the caller; a closed aggregator is reported via tracing.
    pub async fn record(&self, level: LogLevel, component: &str, message: impl Into<String>) {
        let message = message.into();
        debug!(%level, %component, %message, "AggregatorHandle::record: called");
        let req = AggregatorRequest::Record {
            level,
            component: component.to_string(),
            message,
        };
        if self.send(req).await.is_err() {
            warn!(%component, "AggregatorHandle::record: aggregator closed, entry dropped");
        }
    }

    pub async fn info(&self, component: &str, message: impl Into<String>) {
        self.record(LogLevel::Info, component, message).await;
    }

    pub async fn warning(&self, component: &str, message: impl Into<String>) {
        self.record(LogLevel::Warning, component, message).await;
    }

    pub async fn error(&self, component: &str, message: impl Into<String>) {
        self.record(LogLevel::Error, component, message).await;
    }

    /// Merge a partial stats update
    pub async fn update_stats(&self, update: StatsUpdate) -> ControlResult<()> {
        debug!(?update, "AggregatorHandle::update_stats: called");
        self.send(AggregatorRequest::UpdateStats { update }).await
    }

    /// Advance the logical clock and uptime
    pub async fn tick(&self) -> ControlResult<()> {
        self.send(AggregatorRequest::Tick).await
    }

    pub async fn clear_logs(&self) -> ControlResult<()> {
        debug!("AggregatorHandle::clear_logs: called");
        self.send(AggregatorRequest::ClearLogs).await
    }

    /// Current counters
    pub async fn stats(&self) -> ControlResult<SystemStats> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(AggregatorRequest::GetStats { reply_tx }).await?;
        reply_rx.await.map_err(|_| ControlError::ChannelClosed)
    }

    /// Retained log entries matching `filter`, oldest first
    pub async fn logs(&self, filter: LogFilter) -> ControlResult<Vec<LogEntry>> {
        debug!(?filter, "AggregatorHandle::logs: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(AggregatorRequest::GetLogs { filter, reply_tx }).await?;
        reply_rx.await.map_err(|_| ControlError::ChannelClosed)
    }

    pub async fn shutdown(&self) -> ControlResult<()> {
        debug!("AggregatorHandle::shutdown: called");
        self.send(AggregatorRequest::Shutdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = AggregatorHandle::new(tx);

        // Logging is swallowed, queries surface the error
        handle.info("System", "dropped").await;
        assert!(matches!(handle.stats().await, Err(ControlError::ChannelClosed)));
        assert!(matches!(handle.tick().await, Err(ControlError::ChannelClosed)));
    }
}
