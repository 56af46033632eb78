//! Intersect - four-way intersection signal controller
//!
//! Sequences four vehicle signals and their pedestrian crossings under a
//! single mutual-exclusion section, lets VIP traffic preempt regular
//! sequences, and runs load simulations against a small pool of simulated
//! servers while an aggregator keeps the system log and counters.
//!
//! # Core Concepts
//!
//! - **One green at a time**: only the coordinator task mutates signals
//! - **Coupled crossings**: a crossing walks exactly when its signal is red
//! - **Revocable timers**: preemption cancels pending transitions by key
//! - **Observe, don't share**: readers get snapshots and an event feed
//!
//! # Modules
//!
//! - [`coordinator`] - Signal sequencing, mutual exclusion, VIP preemption
//! - [`registry`] - Vehicle and pedestrian signal state
//! - [`pool`] - Simulated server pool
//! - [`harness`] - Load simulation
//! - [`aggregator`] - Bounded system log and counters
//! - [`timesync`] - Client clock registration and Berkeley averaging
//! - [`system`] - The [`Intersection`] facade wiring it all together
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod aggregator;
pub mod chance;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod events;
pub mod export;
pub mod harness;
pub mod pool;
pub mod registry;
pub mod system;
pub mod ticker;
pub mod timer;
pub mod timesync;

// Re-export commonly used types
pub use aggregator::{AggregatorHandle, StatsUpdate, SystemStats};
pub use chance::{Chance, FixedChance, SeededChance, SharedChance, ThreadChance};
pub use config::Config;
pub use coordinator::{Admission, CoordinatorConfig, CoordinatorHandle, CoordinatorState, IntersectionSnapshot};
pub use domain::{LogEntry, LogFilter, LogLevel, PedestrianPhase, Phase, ServerNode, SignalId};
pub use error::{ControlError, ControlResult};
pub use events::{EventBus, IntersectionEvent, TransitionCause};
pub use harness::{LoadTestConfig, RequestKind, RequestOutcome, RequestStatus, TestReport, TestStats};
pub use system::Intersection;
