//! Stats and log aggregator
//!
//! The aggregator is the single writer of the bounded log ring and the
//! system counters. Every other component reaches it through an
//! [`AggregatorHandle`], whose commands are applied one at a time by the
//! actor task, so concurrent increments are never lost.

mod buffer;
mod config;
mod core;
mod handle;
mod messages;

pub use buffer::LogBuffer;
pub use config::AggregatorConfig;
pub use core::Aggregator;
pub use handle::AggregatorHandle;
pub use messages::{AggregatorRequest, StatsUpdate, SystemStats};
