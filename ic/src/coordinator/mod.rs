//! Signal coordinator
//!
//! A single actor task owns the signal registry and the coordinator state.
//! Requests arrive over its channel, timed phase transitions arrive from its
//! [`TimerService`](crate::timer::TimerService), and every mutation happens on
//! that one task:
//! - **Mutual exclusion:** at most one sequence (regular or VIP) in flight
//! - **Sequencing:** Red → Yellow → Green → Yellow → Red on a timed schedule
//! - **Preemption:** a VIP request clears a regular sequence through yellow first

mod config;
mod core;
mod handle;
mod messages;
mod sequence;

pub use config::{CoordinatorConfig, MAX_AUTO_INTERVAL_SECS, SequenceTiming};
pub use core::Coordinator;
pub use handle::CoordinatorHandle;
pub use messages::{Admission, CoordRequest, CoordinatorState, IntersectionSnapshot};
pub use sequence::{Sequence, Step, clearance_path};
