//! Coordinator task implementation

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::aggregator::{AggregatorHandle, StatsUpdate};
use crate::chance::SharedChance;
use crate::domain::{Phase, SignalId};
use crate::error::{ControlError, ControlResult};
use crate::events::{EventBus, IntersectionEvent, TransitionCause};
use crate::registry::SignalRegistry;
use crate::timer::{TimerService, spawn_periodic};

use super::config::{CoordinatorConfig, MAX_AUTO_INTERVAL_SECS};
use super::handle::CoordinatorHandle;
use super::messages::{Admission, CoordRequest, CoordinatorState, IntersectionSnapshot};
use super::sequence::{Sequence, Step, clearance_path};

const SIGNAL_CONTROL: &str = "Signal Control";
const VIP_SYSTEM: &str = "VIP System";

fn component(vip: bool) -> &'static str {
    if vip { VIP_SYSTEM } else { SIGNAL_CONTROL }
}

fn phase_message(signal: SignalId, phase: Phase, note: &str) -> String {
    if note.is_empty() {
        format!("{signal} is now {phase}")
    } else {
        format!("{signal} is now {phase} {note}")
    }
}

/// Periodic request generation
struct AutoGenerate {
    enabled: bool,
    interval_secs: u64,
    task: Option<JoinHandle<()>>,
}

impl AutoGenerate {
    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Sole owner of the signal registry and the mutual-exclusion section
pub struct Coordinator {
    config: CoordinatorConfig,
    tx: mpsc::Sender<CoordRequest>,
    rx: mpsc::Receiver<CoordRequest>,
    aggregator: AggregatorHandle,
    events: Arc<EventBus>,
    chance: SharedChance,
    registry: SignalRegistry,
    /// Sequence holding the critical section, if any
    active: Option<Sequence>,
    /// When the active sequence's pending timer fires
    deadline: Option<Instant>,
    timers: TimerService<SignalId, CoordRequest>,
    generation: u64,
    auto: AutoGenerate,
}

impl Coordinator {
    pub fn new(
        config: CoordinatorConfig,
        aggregator: AggregatorHandle,
        events: Arc<EventBus>,
        chance: SharedChance,
    ) -> Self {
        debug!(?config, "Coordinator::new: called");
        let (tx, rx) = mpsc::channel(config.channel_buffer.max(1));
        let timers = TimerService::new(tx.clone());
        let auto = AutoGenerate {
            enabled: false,
            interval_secs: config.auto_interval_secs.clamp(1, MAX_AUTO_INTERVAL_SECS),
            task: None,
        };
        Self {
            config,
            tx,
            rx,
            aggregator,
            events,
            chance,
            registry: SignalRegistry::new(Utc::now()),
            active: None,
            deadline: None,
            timers,
            generation: 0,
            auto,
        }
    }

    /// Handle for sending commands to this coordinator
    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle::new(self.tx.clone())
    }

    /// Run the coordinator task until shutdown is requested
    pub async fn run(mut self) {
        info!("Coordinator started");

        while let Some(req) = self.rx.recv().await {
            match req {
                CoordRequest::RequestSignal { signal, vip, reply_tx } => {
                    let result = self.request_signal(signal, vip).await;
                    let _ = reply_tx.send(result);
                }

                CoordRequest::Advance { signal, generation } => {
                    self.advance(signal, generation).await;
                }

                CoordRequest::ToggleAutoGenerate { reply_tx } => {
                    let enabled = self.toggle_auto_generate().await;
                    let _ = reply_tx.send(enabled);
                }

                CoordRequest::SetAutoInterval { secs, reply_tx } => {
                    let result = self.set_auto_interval(secs).await;
                    let _ = reply_tx.send(result);
                }

                CoordRequest::GetSnapshot { reply_tx } => {
                    let _ = reply_tx.send(self.snapshot());
                }

                CoordRequest::Shutdown => {
                    info!("Coordinator received shutdown request");
                    break;
                }
            }
        }

        self.timers.cancel_all();
        self.auto.stop();
        info!("Coordinator stopped");
    }

    fn state(&self) -> CoordinatorState {
        CoordinatorState {
            active_signal: self.active.map(|seq| seq.signal),
            vip_active: self.active.is_some_and(|seq| seq.vip),
        }
    }

    /// Time left before the in-flight sequence changes phase
    fn next_change_in(&self) -> Option<std::time::Duration> {
        if self.active.is_none() {
            return None;
        }
        self.deadline.map(|at| at.saturating_duration_since(Instant::now()))
    }

    fn snapshot(&self) -> IntersectionSnapshot {
        IntersectionSnapshot {
            registry: self.registry.snapshot(),
            state: self.state(),
            auto_generate: self.auto.enabled,
            auto_interval_secs: self.auto.interval_secs,
            next_change_in_ms: self.next_change_in().map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        }
    }

    async fn update_stats(&self, update: StatsUpdate) {
        if let Err(e) = self.aggregator.update_stats(update).await {
            warn!(error = %e, "Coordinator: failed to forward stats update");
        }
    }

    fn reject(&self, signal: SignalId, vip: bool, err: ControlError) -> ControlResult<Admission> {
        self.events.emit(IntersectionEvent::RequestRejected {
            signal,
            vip,
            reason: err.to_string(),
        });
        Err(err)
    }

    async fn request_signal(&mut self, signal: SignalId, vip: bool) -> ControlResult<Admission> {
        debug!(%signal, vip, "Coordinator::request_signal: called");
        let kind = if vip { "VIP" } else { "Regular" };
        self.aggregator
            .info(SIGNAL_CONTROL, format!("{kind} request initiated for {signal}"))
            .await;

        if self.chance.hit(self.config.failure_probability) {
            debug!(%signal, "Coordinator::request_signal: injected upstream failure");
            self.aggregator
                .error(component(vip), format!("Request failed for {signal}"))
                .await;
            self.update_stats(StatsUpdate::default().failures(1)).await;
            return self.reject(signal, vip, ControlError::SimulatedFailure(signal));
        }

        let preempted = match self.active {
            None => None,
            Some(seq) if vip && !seq.vip => Some(seq.signal),
            Some(seq) => {
                let err = ControlError::Busy {
                    requested: signal,
                    active: seq.signal,
                    vip_active: seq.vip,
                };
                self.aggregator.warning(component(vip), err.to_string()).await;
                return self.reject(signal, vip, err);
            }
        };

        if let Some(regular) = preempted {
            self.preempt(regular, signal).await;
        }
        self.begin(signal, vip).await;

        let mut update = StatsUpdate::default().requests(1).critical_section(true);
        if vip {
            update = update.vip(1);
        }
        self.update_stats(update).await;

        Ok(Admission {
            signal,
            vip,
            preempted,
        })
    }

    /// Revoke a regular sequence and clear its signal through yellow
    async fn preempt(&mut self, regular: SignalId, by: SignalId) {
        debug!(%regular, %by, "Coordinator::preempt: called");
        self.timers.cancel(&regular);
        self.active = None;
        self.deadline = None;

        self.aggregator
            .warning(VIP_SYSTEM, format!("{regular} preempted by VIP request for {by}"))
            .await;
        self.events.emit(IntersectionEvent::Preempted { preempted: regular, by });

        for &phase in clearance_path(self.registry.phase(regular)) {
            self.set_phase(regular, phase, TransitionCause::Preemption, false);
            self.aggregator
                .warning(SIGNAL_CONTROL, phase_message(regular, phase, "(preempted)"))
                .await;
        }
    }

    async fn begin(&mut self, signal: SignalId, vip: bool) {
        self.generation += 1;
        let seq = Sequence::begin(signal, vip, self.generation);
        debug!(%signal, vip, generation = seq.generation, "Coordinator::begin: called");

        self.set_phase(signal, Phase::Yellow, TransitionCause::Sequence, vip);
        if vip {
            self.aggregator
                .warning(
                    VIP_SYSTEM,
                    format!("VIP request processed: {signal} is now YELLOW (priority transition)"),
                )
                .await;
        } else {
            self.aggregator
                .info(SIGNAL_CONTROL, phase_message(signal, Phase::Yellow, "(transition)"))
                .await;
        }

        self.active = Some(seq);
        self.events.emit(IntersectionEvent::SequenceStarted { signal, vip });
        self.schedule(seq);
    }

    fn schedule(&mut self, seq: Sequence) {
        let delay = seq.step.dwell(self.config.timing(seq.vip));
        self.deadline = Instant::now().checked_add(delay);
        self.timers.schedule(
            seq.signal,
            delay,
            CoordRequest::Advance {
                signal: seq.signal,
                generation: seq.generation,
            },
        );
    }

    /// Apply the next step of the in-flight sequence
    async fn advance(&mut self, signal: SignalId, generation: u64) {
        let Some(mut seq) = self.active.filter(|seq| seq.owns(signal, generation)) else {
            debug!(%signal, generation, "Coordinator::advance: discarding stale timer");
            return;
        };
        self.timers.settle(&signal);

        let (phase, next) = seq.step.after();
        let (source, note) = match (seq.step, seq.vip) {
            (Step::Rising, true) => (VIP_SYSTEM, "(VIP priority)"),
            (Step::Rising, false) => (SIGNAL_CONTROL, ""),
            (Step::Holding, _) => (SIGNAL_CONTROL, "(end transition)"),
            (Step::Clearing, true) => (VIP_SYSTEM, "(VIP sequence complete)"),
            (Step::Clearing, false) => (SIGNAL_CONTROL, ""),
        };
        self.set_phase(signal, phase, TransitionCause::Sequence, seq.vip);
        self.aggregator.info(source, phase_message(signal, phase, note)).await;

        match next {
            Some(step) => {
                seq.step = step;
                self.active = Some(seq);
                self.schedule(seq);
            }
            None => {
                self.active = None;
                self.deadline = None;
                debug!(%signal, vip = seq.vip, "Coordinator::advance: sequence complete");
                self.events.emit(IntersectionEvent::SequenceCompleted { signal, vip: seq.vip });
                self.update_stats(StatsUpdate::default().critical_section(false)).await;
            }
        }
    }

    /// Single point where a phase changes; the event carries the registry right after it
    fn set_phase(&mut self, signal: SignalId, phase: Phase, cause: TransitionCause, vip: bool) {
        let transition = self.registry.set_phase(signal, phase, Utc::now());
        debug!(%signal, from = %transition.from, to = %phase, ?cause, "Phase changed");
        self.events.emit(IntersectionEvent::PhaseChanged {
            transition,
            cause,
            vip,
            snapshot: self.registry.snapshot(),
        });
    }

    async fn toggle_auto_generate(&mut self) -> bool {
        self.auto.enabled = !self.auto.enabled;
        debug!(enabled = self.auto.enabled, "Coordinator::toggle_auto_generate: called");
        if self.auto.enabled {
            self.start_auto_generate();
            self.aggregator
                .info(
                    "System",
                    format!("Auto-generation enabled every {}s", self.auto.interval_secs),
                )
                .await;
        } else {
            self.auto.stop();
            self.aggregator.info("System", "Auto-generation disabled").await;
        }
        self.auto.enabled
    }

    async fn set_auto_interval(&mut self, secs: u64) -> ControlResult<()> {
        debug!(secs, "Coordinator::set_auto_interval: called");
        if !(1..=MAX_AUTO_INTERVAL_SECS).contains(&secs) {
            return Err(ControlError::InvalidConfig(format!(
                "auto-generation interval must be between 1 and {MAX_AUTO_INTERVAL_SECS} seconds, got {secs}"
            )));
        }
        self.auto.interval_secs = secs;
        if self.auto.enabled {
            self.start_auto_generate();
        }
        self.aggregator
            .info("System", format!("Auto-generation interval set to {secs}s"))
            .await;
        Ok(())
    }

    fn start_auto_generate(&mut self) {
        self.auto.stop();
        let period = std::time::Duration::from_secs(self.auto.interval_secs);
        let handle = self.handle();
        let chance = self.chance.clone();
        let burst_probability = self.config.auto_burst_probability;
        let stagger = self.config.auto_stagger();

        self.auto.task = Some(spawn_periodic(period, move || {
            let handle = handle.clone();
            let chance = chance.clone();
            async move {
                let count = if chance.hit(burst_probability) { 2 } else { 1 };
                for i in 0..count {
                    if i > 0 {
                        tokio::time::sleep(stagger).await;
                    }
                    let signal = SignalId::ALL[chance.pick(SignalId::ALL.len())];
                    match handle.request_signal(signal, false).await {
                        Ok(_) => {}
                        Err(ControlError::ChannelClosed) => return false,
                        Err(e) if e.is_retryable() => {
                            debug!(%signal, error = %e, "Auto-generated request rejected");
                        }
                        Err(e) => warn!(%signal, error = %e, "Auto-generated request failed"),
                    }
                }
                true
            }
        }));
    }
}
