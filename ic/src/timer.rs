//! Clock and timer service
//!
//! Delayed callbacks are tokio tasks that sleep and then deliver a message to
//! an actor's channel. Each pending callback is keyed, so the owner can revoke
//! it directly instead of chasing nested closures. Periodic callbacks run on a
//! tokio interval until their handle is aborted.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Keyed one-shot timers that deliver `M` to an actor channel
///
/// Aborting a timer stops delivery only if its message has not been sent yet;
/// receivers that must never act on a revoked timer should also carry a
/// generation in `M` and discard stale ones.
pub struct TimerService<K, M> {
    tx: mpsc::Sender<M>,
    pending: HashMap<K, AbortHandle>,
}

impl<K, M> TimerService<K, M>
where
    K: Eq + Hash + Clone + Debug,
    M: Send + 'static,
{
    pub fn new(tx: mpsc::Sender<M>) -> Self {
        Self {
            tx,
            pending: HashMap::new(),
        }
    }

    /// Deliver `msg` after `delay`, replacing any timer already pending for `key`
    pub fn schedule(&mut self, key: K, delay: Duration, msg: M) {
        debug!(?key, ?delay, "TimerService::schedule: called");
        self.cancel(&key);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(msg).await;
        });
        self.pending.insert(key, handle.abort_handle());
    }

    /// Revoke the pending timer for `key`; returns whether one existed
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.pending.remove(key) {
            Some(handle) => {
                debug!(?key, "TimerService::cancel: aborting pending timer");
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Forget a timer whose message has been received
    pub fn settle(&mut self, key: &K) {
        self.pending.remove(key);
    }

    /// Revoke every pending timer
    pub fn cancel_all(&mut self) {
        debug!(count = self.pending.len(), "TimerService::cancel_all: called");
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl<K, M> Drop for TimerService<K, M> {
    fn drop(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }
}

/// Run `tick` every `period`, first firing one full period from now
///
/// The loop ends when `tick` returns `false` or the returned handle is aborted.
/// A period too long to schedule never ticks.
pub fn spawn_periodic<F, Fut>(period: Duration, mut tick: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    debug!(?period, "spawn_periodic: called");
    let Some(start) = Instant::now().checked_add(period) else {
        warn!(?period, "spawn_periodic: period out of range, not starting");
        return tokio::spawn(async {});
    };
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if !tick().await {
                debug!("spawn_periodic: tick requested stop");
                break;
            }
        }
    })
}
