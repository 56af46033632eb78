//! Event types emitted by the intersection components

use serde::{Deserialize, Serialize};

use crate::domain::{LogEntry, ServerNode, SignalId};
use crate::registry::{RegistrySnapshot, Transition};

/// Why a phase changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionCause {
    /// A step of the timed sequence
    Sequence,
    /// Forced clearance of a sequence preempted by a VIP request
    Preemption,
}

/// Everything observable about the running intersection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum IntersectionEvent {
    /// A vehicle signal (and its pedestrian pair) changed phase
    PhaseChanged {
        transition: Transition,
        cause: TransitionCause,
        vip: bool,
        /// Registry state right after the change
        snapshot: RegistrySnapshot,
    },

    /// A request was admitted and its sequence began
    SequenceStarted { signal: SignalId, vip: bool },

    /// A sequence reached red and released the critical section
    SequenceCompleted { signal: SignalId, vip: bool },

    /// A regular sequence was cut short by a VIP request
    Preempted { preempted: SignalId, by: SignalId },

    /// A request was turned away (busy or upstream failure)
    RequestRejected { signal: SignalId, vip: bool, reason: String },

    /// The aggregator appended a log entry
    LogRecorded { entry: LogEntry },

    /// A pool node changed connection state
    ServerChanged { server: ServerNode },

    /// A load test finished and its report is available
    LoadTestCompleted {
        run_id: String,
        total: usize,
        successes: usize,
    },
}

impl IntersectionEvent {
    /// Variant name, for logging and filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PhaseChanged { .. } => "PhaseChanged",
            Self::SequenceStarted { .. } => "SequenceStarted",
            Self::SequenceCompleted { .. } => "SequenceCompleted",
            Self::Preempted { .. } => "Preempted",
            Self::RequestRejected { .. } => "RequestRejected",
            Self::LogRecorded { .. } => "LogRecorded",
            Self::ServerChanged { .. } => "ServerChanged",
            Self::LoadTestCompleted { .. } => "LoadTestCompleted",
        }
    }

    /// The vehicle signal this event concerns, if any
    pub fn signal(&self) -> Option<SignalId> {
        match self {
            Self::PhaseChanged { transition, .. } => Some(transition.signal),
            Self::SequenceStarted { signal, .. }
            | Self::SequenceCompleted { signal, .. }
            | Self::RequestRejected { signal, .. } => Some(*signal),
            Self::Preempted { preempted, .. } => Some(*preempted),
            Self::LogRecorded { .. } | Self::ServerChanged { .. } | Self::LoadTestCompleted { .. } => None,
        }
    }
}
