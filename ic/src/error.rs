//! Error taxonomy for intersection control operations
//!
//! Every variant is a local, recoverable outcome. Nothing here ends the process.

use thiserror::Error;

use crate::domain::SignalId;

/// Errors returned by coordinator, pool, harness, and time-sync operations
#[derive(Debug, Error)]
pub enum ControlError {
    /// The mutual-exclusion section is held by a sequence this request cannot preempt
    #[error("Signal request for {requested} rejected: {active} sequence in flight{}", vip_suffix(.vip_active))]
    Busy {
        requested: SignalId,
        active: SignalId,
        vip_active: bool,
    },

    /// Injected upstream rejection of an otherwise valid request
    #[error("Request for {0} failed upstream")]
    SimulatedFailure(SignalId),

    #[error("Invalid time format '{0}'. Use HH:MM:SS")]
    InvalidTimeFormat(String),

    #[error("Unknown {kind}: {id}")]
    UnknownEntity { kind: &'static str, id: String },

    #[error("No connected server available")]
    NoEligibleServer,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Channel error")]
    ChannelClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ControlError {
    /// Build an `UnknownEntity` error for a signal id
    pub fn unknown_signal(id: impl Into<String>) -> Self {
        Self::UnknownEntity {
            kind: "signal",
            id: id.into(),
        }
    }

    /// Build an `UnknownEntity` error for a server id
    pub fn unknown_server(id: impl Into<String>) -> Self {
        Self::UnknownEntity {
            kind: "server",
            id: id.into(),
        }
    }

    /// True for rejections a caller may retry later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy { .. } | Self::SimulatedFailure(_) | Self::NoEligibleServer)
    }
}

fn vip_suffix(vip_active: &bool) -> &'static str {
    if *vip_active { " (VIP)" } else { "" }
}

/// Result alias for control operations
pub type ControlResult<T> = Result<T, ControlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_message_mentions_vip() {
        let err = ControlError::Busy {
            requested: SignalId::T1,
            active: SignalId::T3,
            vip_active: true,
        };
        let msg = err.to_string();
        assert!(msg.contains("T1"));
        assert!(msg.contains("T3"));
        assert!(msg.contains("(VIP)"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_unknown_entity_message() {
        let err = ControlError::unknown_server("backup");
        assert_eq!(err.to_string(), "Unknown server: backup");
        assert!(!err.is_retryable());
    }
}
