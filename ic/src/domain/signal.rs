//! Vehicle and pedestrian signals

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// One of the four vehicle approaches of the intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SignalId {
    T1,
    T2,
    T3,
    T4,
}

impl SignalId {
    /// All vehicle signals in approach order
    pub const ALL: [SignalId; 4] = [SignalId::T1, SignalId::T2, SignalId::T3, SignalId::T4];

    /// Zero-based slot in the registry
    pub fn index(self) -> usize {
        match self {
            SignalId::T1 => 0,
            SignalId::T2 => 1,
            SignalId::T3 => 2,
            SignalId::T4 => 3,
        }
    }

    /// Signal at a zero-based slot, if any
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Label of the paired pedestrian crossing (`P1` for `T1`)
    pub fn pedestrian_label(self) -> String {
        format!("P{}", self.index() + 1)
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.index() + 1)
    }
}

impl FromStr for SignalId {
    type Err = ControlError;

    /// Accepts `T1`..`T4` (case-insensitive) or a bare route number `1`..`4`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('T')
            .or_else(|| trimmed.strip_prefix('t'))
            .unwrap_or(trimmed);
        match digits {
            "1" => Ok(SignalId::T1),
            "2" => Ok(SignalId::T2),
            "3" => Ok(SignalId::T3),
            "4" => Ok(SignalId::T4),
            _ => Err(ControlError::unknown_signal(trimmed)),
        }
    }
}

/// Vehicle signal phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Red,
    Yellow,
    Green,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Red => "RED",
            Phase::Yellow => "YELLOW",
            Phase::Green => "GREEN",
        };
        f.write_str(label)
    }
}

/// Pedestrian crossing phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PedestrianPhase {
    Walk,
    DontWalk,
}

impl PedestrianPhase {
    /// Pedestrians may walk exactly when the paired vehicle signal is red
    pub fn for_vehicle(phase: Phase) -> Self {
        match phase {
            Phase::Red => PedestrianPhase::Walk,
            Phase::Yellow | Phase::Green => PedestrianPhase::DontWalk,
        }
    }
}

impl fmt::Display for PedestrianPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PedestrianPhase::Walk => f.write_str("WALK"),
            PedestrianPhase::DontWalk => f.write_str("DON'T WALK"),
        }
    }
}

/// A vehicle signal and when it last changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub phase: Phase,
    #[serde(rename = "last-changed-at")]
    pub last_changed_at: DateTime<Utc>,
}

impl Signal {
    pub fn new(id: SignalId, at: DateTime<Utc>) -> Self {
        Self {
            id,
            phase: Phase::Red,
            last_changed_at: at,
        }
    }
}

/// A pedestrian crossing, paired with the vehicle signal of the same number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedestrianSignal {
    /// The vehicle signal this crossing is paired with
    pub pair: SignalId,
    pub phase: PedestrianPhase,
    #[serde(rename = "last-changed-at")]
    pub last_changed_at: DateTime<Utc>,
}

impl PedestrianSignal {
    pub fn new(pair: SignalId, at: DateTime<Utc>) -> Self {
        Self {
            pair,
            phase: PedestrianPhase::Walk,
            last_changed_at: at,
        }
    }

    /// Display label (`P1`..`P4`)
    pub fn label(&self) -> String {
        self.pair.pedestrian_label()
    }
}
