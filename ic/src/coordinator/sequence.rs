//! Phase sequence state machine
//!
//! An accepted request turns its signal yellow and then walks these steps,
//! each dwelling for its configured time before the next phase applies:
//!
//! ```text
//!   Red --accept--> Yellow [Rising] --t1--> Green [Holding] --t2--> Yellow [Clearing] --t3--> Red
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{Phase, SignalId};

use super::config::SequenceTiming;

/// Position within a sequence; the signal's phase while dwelling here is [`Step::phase`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    /// Yellow, heading to green
    Rising,
    /// Green
    Holding,
    /// Yellow, heading to red
    Clearing,
}

impl Step {
    pub fn phase(self) -> Phase {
        match self {
            Step::Rising | Step::Clearing => Phase::Yellow,
            Step::Holding => Phase::Green,
        }
    }

    /// How long the signal stays in this step
    pub fn dwell(self, timing: &SequenceTiming) -> Duration {
        match self {
            Step::Rising => timing.rise(),
            Step::Holding => timing.green(),
            Step::Clearing => timing.clear(),
        }
    }

    /// Phase applied when this step's dwell expires, and the step that follows
    ///
    /// `None` means the sequence has reached red and is done.
    pub fn after(self) -> (Phase, Option<Step>) {
        match self {
            Step::Rising => (Phase::Green, Some(Step::Holding)),
            Step::Holding => (Phase::Yellow, Some(Step::Clearing)),
            Step::Clearing => (Phase::Red, None),
        }
    }
}

/// The sequence currently holding the critical section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequence {
    pub signal: SignalId,
    pub vip: bool,
    pub step: Step,
    /// Distinguishes this sequence's timers from revoked ones
    pub generation: u64,
}

impl Sequence {
    pub fn begin(signal: SignalId, vip: bool, generation: u64) -> Self {
        Self {
            signal,
            vip,
            step: Step::Rising,
            generation,
        }
    }

    /// True if a timer message belongs to this sequence
    pub fn owns(&self, signal: SignalId, generation: u64) -> bool {
        self.signal == signal && self.generation == generation
    }
}

/// Phases a preempted signal passes through to reach red
///
/// Green never jumps straight to red.
pub fn clearance_path(current: Phase) -> &'static [Phase] {
    match current {
        Phase::Green => &[Phase::Yellow, Phase::Red],
        Phase::Yellow => &[Phase::Red],
        Phase::Red => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_walk() {
        let timing = SequenceTiming::regular();
        let mut step = Step::Rising;
        let mut phases = vec![step.phase()];
        let mut elapsed = Duration::ZERO;
        loop {
            elapsed += step.dwell(&timing);
            let (phase, next) = step.after();
            phases.push(phase);
            match next {
                Some(n) => step = n,
                None => break,
            }
        }
        assert_eq!(phases, vec![Phase::Yellow, Phase::Green, Phase::Yellow, Phase::Red]);
        assert_eq!(elapsed, timing.total());
    }

    #[test]
    fn test_vip_green_is_shorter() {
        assert!(Step::Holding.dwell(&SequenceTiming::vip()) < Step::Holding.dwell(&SequenceTiming::regular()));
        assert_eq!(Step::Holding.dwell(&SequenceTiming::vip()), Duration::from_secs(3));
    }

    #[test]
    fn test_clearance_path_never_skips_yellow() {
        assert_eq!(clearance_path(Phase::Green), &[Phase::Yellow, Phase::Red]);
        assert_eq!(clearance_path(Phase::Yellow), &[Phase::Red]);
        assert!(clearance_path(Phase::Red).is_empty());
    }

    #[test]
    fn test_ownership() {
        let seq = Sequence::begin(SignalId::T2, false, 7);
        assert!(seq.owns(SignalId::T2, 7));
        assert!(!seq.owns(SignalId::T2, 6));
        assert!(!seq.owns(SignalId::T3, 7));
    }
}
