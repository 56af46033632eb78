//! Signal registry
//!
//! Holds the four vehicle signals and their pedestrian pairs. The only way to
//! change a phase is [`SignalRegistry::set_phase`], which rewrites the vehicle
//! signal and its pedestrian pair in one step, so the coupling invariant holds
//! after every call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{PedestrianPhase, PedestrianSignal, Phase, Signal, SignalId};

/// Result of a single phase change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub signal: SignalId,
    pub from: Phase,
    pub to: Phase,
    pub pedestrian: PedestrianPhase,
}

/// Point-in-time copy of every signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub signals: Vec<Signal>,
    pub pedestrians: Vec<PedestrianSignal>,
}

impl RegistrySnapshot {
    pub fn phase(&self, id: SignalId) -> Phase {
        self.signals[id.index()].phase
    }

    pub fn pedestrian_phase(&self, id: SignalId) -> PedestrianPhase {
        self.pedestrians[id.index()].phase
    }

    pub fn green_count(&self) -> usize {
        self.signals.iter().filter(|s| s.phase == Phase::Green).count()
    }

    /// At most one green, and every crossing walks iff its vehicle signal is red
    pub fn is_consistent(&self) -> bool {
        self.green_count() <= 1
            && self
                .signals
                .iter()
                .zip(&self.pedestrians)
                .all(|(s, p)| s.id == p.pair && p.phase == PedestrianPhase::for_vehicle(s.phase))
    }
}

/// Owner of the four signal pairs
#[derive(Debug, Clone)]
pub struct SignalRegistry {
    signals: [Signal; 4],
    pedestrians: [PedestrianSignal; 4],
}

impl SignalRegistry {
    /// All vehicle signals red, all crossings walking
    pub fn new(at: DateTime<Utc>) -> Self {
        debug!("SignalRegistry::new: called");
        Self {
            signals: SignalId::ALL.map(|id| Signal::new(id, at)),
            pedestrians: SignalId::ALL.map(|id| PedestrianSignal::new(id, at)),
        }
    }

    pub fn phase(&self, id: SignalId) -> Phase {
        self.signals[id.index()].phase
    }

    pub fn pedestrian(&self, id: SignalId) -> &PedestrianSignal {
        &self.pedestrians[id.index()]
    }

    /// Signal currently showing green, if any
    pub fn green(&self) -> Option<SignalId> {
        self.signals.iter().find(|s| s.phase == Phase::Green).map(|s| s.id)
    }

    /// Set a vehicle phase and flip its pedestrian pair in the same step
    pub fn set_phase(&mut self, id: SignalId, phase: Phase, at: DateTime<Utc>) -> Transition {
        debug!(%id, %phase, "SignalRegistry::set_phase: called");
        let slot = id.index();
        let from = self.signals[slot].phase;
        let pedestrian = PedestrianPhase::for_vehicle(phase);

        self.signals[slot].phase = phase;
        self.signals[slot].last_changed_at = at;
        if self.pedestrians[slot].phase != pedestrian {
            self.pedestrians[slot].phase = pedestrian;
            self.pedestrians[slot].last_changed_at = at;
        }

        Transition {
            signal: id,
            from,
            to: phase,
            pedestrian,
        }
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            signals: self.signals.to_vec(),
            pedestrians: self.pedestrians.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_initial_state() {
        let registry = SignalRegistry::new(Utc::now());
        let snap = registry.snapshot();
        assert_eq!(snap.signals.len(), 4);
        assert!(snap.signals.iter().all(|s| s.phase == Phase::Red));
        assert!(snap.pedestrians.iter().all(|p| p.phase == PedestrianPhase::Walk));
        assert!(snap.is_consistent());
        assert_eq!(registry.green(), None);
    }

    #[test]
    fn test_set_phase_flips_pedestrian() {
        let mut registry = SignalRegistry::new(Utc::now());

        let t = registry.set_phase(SignalId::T2, Phase::Yellow, Utc::now());
        assert_eq!(t.from, Phase::Red);
        assert_eq!(t.to, Phase::Yellow);
        assert_eq!(t.pedestrian, PedestrianPhase::DontWalk);
        assert_eq!(registry.pedestrian(SignalId::T2).phase, PedestrianPhase::DontWalk);

        registry.set_phase(SignalId::T2, Phase::Green, Utc::now());
        assert_eq!(registry.green(), Some(SignalId::T2));
        assert_eq!(registry.pedestrian(SignalId::T2).phase, PedestrianPhase::DontWalk);

        registry.set_phase(SignalId::T2, Phase::Red, Utc::now());
        assert_eq!(registry.pedestrian(SignalId::T2).phase, PedestrianPhase::Walk);
        assert_eq!(registry.pedestrian(SignalId::T2).label(), "P2");
    }

    #[test]
    fn test_other_signals_untouched() {
        let mut registry = SignalRegistry::new(Utc::now());
        registry.set_phase(SignalId::T1, Phase::Green, Utc::now());
        for id in [SignalId::T2, SignalId::T3, SignalId::T4] {
            assert_eq!(registry.phase(id), Phase::Red);
            assert_eq!(registry.pedestrian(id).phase, PedestrianPhase::Walk);
        }
    }

    fn phase_strategy() -> impl Strategy<Value = Phase> {
        prop_oneof![Just(Phase::Red), Just(Phase::Yellow), Just(Phase::Green)]
    }

    proptest! {
        #[test]
        fn prop_pedestrian_coupling_holds_after_every_change(
            changes in proptest::collection::vec((0usize..4, phase_strategy()), 0..64)
        ) {
            let mut registry = SignalRegistry::new(Utc::now());
            for (slot, phase) in changes {
                let id = SignalId::from_index(slot).unwrap();
                registry.set_phase(id, phase, Utc::now());
                for id in SignalId::ALL {
                    let walk = registry.pedestrian(id).phase == PedestrianPhase::Walk;
                    prop_assert_eq!(walk, registry.phase(id) == Phase::Red);
                }
            }
        }
    }
}
