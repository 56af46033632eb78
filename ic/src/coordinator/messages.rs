//! Message types for the coordinator

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::domain::SignalId;
use crate::error::ControlResult;
use crate::registry::RegistrySnapshot;

/// An accepted signal request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub signal: SignalId,
    pub vip: bool,
    /// Regular sequence cut short to admit this VIP request
    pub preempted: Option<SignalId>,
}

/// Occupancy of the mutual-exclusion section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CoordinatorState {
    pub active_signal: Option<SignalId>,
    pub vip_active: bool,
}

impl CoordinatorState {
    pub fn is_idle(&self) -> bool {
        self.active_signal.is_none()
    }
}

/// Everything an observer may read from the coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IntersectionSnapshot {
    pub registry: RegistrySnapshot,
    pub state: CoordinatorState,
    pub auto_generate: bool,
    pub auto_interval_secs: u64,
    /// Time left before the in-flight sequence's next phase change; `None` when idle
    pub next_change_in_ms: Option<u64>,
}

/// Requests to the coordinator task
#[derive(Debug)]
pub enum CoordRequest {
    /// Ask for a signal sequence
    RequestSignal {
        signal: SignalId,
        vip: bool,
        reply_tx: oneshot::Sender<ControlResult<Admission>>,
    },

    /// Timer expiry for a sequence step (internal)
    Advance { signal: SignalId, generation: u64 },

    /// Flip periodic request generation on or off; replies with the new setting
    ToggleAutoGenerate { reply_tx: oneshot::Sender<bool> },

    /// Change the auto-generation period
    SetAutoInterval {
        secs: u64,
        reply_tx: oneshot::Sender<ControlResult<()>>,
    },

    /// Read signals and coordinator state
    GetSnapshot {
        reply_tx: oneshot::Sender<IntersectionSnapshot>,
    },

    /// Stop the coordinator, revoking every pending timer
    Shutdown,
}
