//! Injectable randomness
//!
//! Every probabilistic decision in the simulation (upstream failures, server
//! selection, latency jitter, load drift) draws from a [`Chance`]. Production
//! code uses [`ThreadChance`]; a seed in the config switches to
//! [`SeededChance`]; tests pin outcomes with [`FixedChance`].

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Source of uniform random draws
pub trait Chance: Send + Sync {
    /// Uniform draw in `[0, 1)`
    fn roll(&self) -> f64;

    /// Uniform index in `[0, len)`; `len` is never zero
    fn pick(&self, len: usize) -> usize;

    /// True with probability `p`
    fn hit(&self, p: f64) -> bool {
        self.roll() < p
    }

    /// Uniform integer in `[-max, max]`
    fn delta(&self, max: u32) -> i64 {
        let span = 2 * max as usize + 1;
        self.pick(span) as i64 - i64::from(max)
    }
}

/// Shared handle to a randomness source
pub type SharedChance = Arc<dyn Chance>;

/// Thread-local OS-seeded generator
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadChance;

impl Chance for ThreadChance {
    fn roll(&self) -> f64 {
        rand::rng().random::<f64>()
    }

    fn pick(&self, len: usize) -> usize {
        rand::rng().random_range(0..len)
    }
}

/// Reproducible generator seeded from config
pub struct SeededChance {
    rng: Mutex<StdRng>,
}

impl SeededChance {
    pub fn new(seed: u64) -> Self {
        debug!(seed, "SeededChance::new: called");
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Chance for SeededChance {
    fn roll(&self) -> f64 {
        match self.rng.lock() {
            Ok(mut rng) => rng.random::<f64>(),
            Err(poisoned) => poisoned.into_inner().random::<f64>(),
        }
    }

    fn pick(&self, len: usize) -> usize {
        match self.rng.lock() {
            Ok(mut rng) => rng.random_range(0..len),
            Err(poisoned) => poisoned.into_inner().random_range(0..len),
        }
    }
}

/// Constant draws, for deterministic tests and dry runs
#[derive(Debug, Clone, Copy)]
pub struct FixedChance {
    pub roll: f64,
    pub pick: usize,
}

impl FixedChance {
    /// Never trips a probability check and always picks the first candidate
    pub fn calm() -> Self {
        Self { roll: 0.999, pick: 0 }
    }

    /// Trips every probability check
    pub fn unlucky() -> Self {
        Self { roll: 0.0, pick: 0 }
    }
}

impl Chance for FixedChance {
    fn roll(&self) -> f64 {
        self.roll
    }

    fn pick(&self, len: usize) -> usize {
        self.pick.min(len.saturating_sub(1))
    }
}

/// Pick the source the config asks for
pub fn from_seed(seed: Option<u64>) -> SharedChance {
    match seed {
        Some(seed) => Arc::new(SeededChance::new(seed)),
        None => Arc::new(ThreadChance),
    }
}
