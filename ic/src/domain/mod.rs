//! Domain types for the intersection
//!
//! Signals and their pedestrian pairs, simulated server nodes, and the
//! structured log entries consumed by observers.

mod log;
mod server;
mod signal;

pub use log::{LogEntry, LogFilter, LogLevel};
pub use server::{ServerNode, ServerRole, default_servers};
pub use signal::{PedestrianPhase, PedestrianSignal, Phase, Signal, SignalId};
