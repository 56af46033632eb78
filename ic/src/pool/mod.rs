//! Simulated server pool
//!
//! A fixed set of named nodes with connection state and a bounded load
//! counter. Reads are lock-guarded snapshots; the harness and the background
//! ticker mutate load concurrently and races between them are acceptable.

mod config;
mod core;

pub use config::PoolConfig;
pub use core::{SYSTEM, ServerPool};
