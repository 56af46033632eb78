//! Load simulation harness
//!
//! Fires a batch of logically concurrent simulated requests against the
//! server pool, waits for every one of them to resolve, then summarizes.

mod config;
mod core;
mod types;

pub use config::HarnessConfig;
pub use core::{LOAD_TESTING, LoadHarness};
pub use types::{
    LoadTestConfig, RequestKind, RequestOutcome, RequestStatus, TestReport, TestStats, UNKNOWN_SERVER, summarize,
};
