//! CoordinatorHandle - client interface for signal requests

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::domain::SignalId;
use crate::error::{ControlError, ControlResult};

use super::messages::{Admission, CoordRequest, CoordinatorState, IntersectionSnapshot};

/// Cloneable handle to the coordinator task
///
/// All operations are serialized by the coordinator, so concurrent callers
/// never observe a half-applied transition.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<CoordRequest>,
}

impl CoordinatorHandle {
    pub(crate) fn new(tx: mpsc::Sender<CoordRequest>) -> Self {
        Self { tx }
    }

    async fn send(&self, req: CoordRequest) -> ControlResult<()> {
        self.tx.send(req).await.map_err(|_| ControlError::ChannelClosed)
    }

    /// Ask for a regular or VIP sequence on `signal`
    pub async fn request_signal(&self, signal: SignalId, vip: bool) -> ControlResult<Admission> {
        debug!(%signal, vip, "CoordinatorHandle::request_signal: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(CoordRequest::RequestSignal { signal, vip, reply_tx }).await?;
        reply_rx.await.map_err(|_| ControlError::ChannelClosed)?
    }

    /// Parse a signal label (`T1`, `t2`, `3`) and request it
    pub async fn request_signal_named(&self, signal: &str, vip: bool) -> ControlResult<Admission> {
        let signal = signal.parse::<SignalId>()?;
        self.request_signal(signal, vip).await
    }

    /// Flip auto-generation; returns whether it is now enabled
    pub async fn toggle_auto_generate(&self) -> ControlResult<bool> {
        debug!("CoordinatorHandle::toggle_auto_generate: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(CoordRequest::ToggleAutoGenerate { reply_tx }).await?;
        reply_rx.await.map_err(|_| ControlError::ChannelClosed)
    }

    pub async fn set_auto_interval(&self, secs: u64) -> ControlResult<()> {
        debug!(secs, "CoordinatorHandle::set_auto_interval: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(CoordRequest::SetAutoInterval { secs, reply_tx }).await?;
        reply_rx.await.map_err(|_| ControlError::ChannelClosed)?
    }

    pub async fn snapshot(&self) -> ControlResult<IntersectionSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(CoordRequest::GetSnapshot { reply_tx }).await?;
        reply_rx.await.map_err(|_| ControlError::ChannelClosed)
    }

    pub async fn state(&self) -> ControlResult<CoordinatorState> {
        Ok(self.snapshot().await?.state)
    }

    pub async fn shutdown(&self) -> ControlResult<()> {
        debug!("CoordinatorHandle::shutdown: called");
        self.send(CoordRequest::Shutdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_named_request_rejects_unknown_signal() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = CoordinatorHandle::new(tx);
        let err = handle.request_signal_named("T9", false).await.unwrap_err();
        assert!(matches!(err, ControlError::UnknownEntity { kind: "signal", .. }));
    }

    #[tokio::test]
    async fn test_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = CoordinatorHandle::new(tx);
        assert!(matches!(handle.snapshot().await, Err(ControlError::ChannelClosed)));
        assert!(matches!(
            handle.request_signal(SignalId::T1, false).await,
            Err(ControlError::ChannelClosed)
        ));
    }
}
