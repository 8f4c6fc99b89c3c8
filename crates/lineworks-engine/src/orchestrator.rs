//! Lifecycle orchestration: start, completion monitoring, stop, reset.
//!
//! # Lifecycle phases
//!
//! ```text
//! Idle ──start()──▶ Running ──stop()──▶ Stopping ──joins done──▶ Idle
//!                      ▲                                       │
//!                      └──────────────── start() ◀─────────────┘
//! ```
//!
//! `stop()` takes the run out of the phase slot under the lifecycle lock,
//! then signals and joins threads with the lock released. A monitor
//! thread that calls `stop()` concurrently therefore sees `Stopping` and
//! backs off instead of deadlocking, and `reset()` waits on a condvar
//! until the phase is `Idle` again.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::Receiver;
use lineworks_core::{
    BufferId, ConfigError, History, Layout, ModeCell, SimulationMode, SinkHub, Snapshot,
    StopHandle, TransitionError, WorkerId,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::generator::Generator;
use crate::monitor::{self, GeneratorSlot, Watch};
use crate::notify::{ChangeEvent, ChangeNotifier};
use crate::recorder::Recorder;
use crate::topology::Topology;
use crate::worker::WorkerReport;

// ── StopReport ─────────────────────────────────────────────────────

/// Summary of a completed `stop()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StopReport {
    /// Items the generator put into the entry buffer.
    pub items_produced: usize,
    /// Items fully served, summed over all workers.
    pub items_forwarded: u64,
    /// Items dropped because the stop interrupted their service.
    pub items_abandoned: usize,
    /// Worker threads joined without panicking.
    pub workers_joined: usize,
    /// History length after the final snapshot.
    pub snapshots: usize,
    /// Wall time from start to the stop request.
    pub run_ms: u64,
    /// Wall time spent stopping.
    pub stop_ms: u64,
}

// ── Internal state ─────────────────────────────────────────────────

enum Phase {
    Idle,
    Running(Box<ActiveRun>),
    Stopping,
}

struct ActiveRun {
    stop: StopHandle,
    topology: Arc<Topology>,
    layout: Layout,
    generator: Arc<Generator>,
    generator_thread: GeneratorSlot,
    workers: Vec<JoinHandle<WorkerReport>>,
    recorder: Option<JoinHandle<usize>>,
    monitor: Option<JoinHandle<()>>,
    started: Instant,
}

impl ActiveRun {
    fn live_threads(&self) -> usize {
        fn alive<T>(h: &JoinHandle<T>) -> usize {
            usize::from(!h.is_finished())
        }
        let workers: usize = self.workers.iter().map(alive).sum();
        let generator = lock(&self.generator_thread).as_ref().map_or(0, alive);
        let recorder = self.recorder.as_ref().map_or(0, alive);
        let monitor = self.monitor.as_ref().map_or(0, alive);
        workers + generator + recorder + monitor
    }
}

#[derive(Default)]
struct Halted {
    forwarded: u64,
    abandoned: usize,
    joined: usize,
}

struct Shared {
    config: EngineConfig,
    topology: Mutex<Topology>,
    notifier: ChangeNotifier,
    events: Receiver<ChangeEvent>,
    history: Arc<History>,
    sinks: Arc<SinkHub>,
    mode: Arc<ModeCell>,
    recorder: Recorder,
    /// Layout of the run that produced the current history.
    recorded_layout: Mutex<Layout>,
    phase: Mutex<Phase>,
    phase_changed: Condvar,
}

// ── Orchestrator ───────────────────────────────────────────────────

/// Owns the topology and drives live runs over it.
///
/// Builder operations are only accepted while no run is active. A run
/// ends either through an explicit [`stop`](Self::stop) or when the
/// completion monitor sees the line drained.
pub struct Orchestrator {
    shared: Arc<Shared>,
}

// Compile-time assertion: Orchestrator must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Orchestrator>();
};

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("mode", &self.mode())
            .field("running", &self.is_running())
            .field("history", &self.shared.history)
            .finish()
    }
}

impl Orchestrator {
    /// An orchestrator with fresh history, sink hub, and mode cell.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_parts(
            config,
            Arc::new(History::new()),
            Arc::new(SinkHub::new()),
            Arc::new(ModeCell::new()),
        )
    }

    /// An orchestrator sharing `history`, `sinks`, and `mode` with other
    /// components such as a replayer.
    pub fn with_parts(
        config: EngineConfig,
        history: Arc<History>,
        sinks: Arc<SinkHub>,
        mode: Arc<ModeCell>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (notifier, events) = ChangeNotifier::channel();
        let recorder = Recorder::new(Arc::clone(&history), Arc::clone(&sinks), Arc::clone(&mode));
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                topology: Mutex::new(Topology::with_notifier(notifier.clone())),
                notifier,
                events,
                history,
                sinks,
                mode,
                recorder,
                recorded_layout: Mutex::new(Layout::default()),
                phase: Mutex::new(Phase::Idle),
                phase_changed: Condvar::new(),
            }),
        })
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Recorded history of the current or last run.
    pub fn history(&self) -> &Arc<History> {
        &self.shared.history
    }

    /// Subscribers receiving live frames.
    pub fn sinks(&self) -> &Arc<SinkHub> {
        &self.shared.sinks
    }

    /// The shared mode cell.
    pub fn mode_cell(&self) -> &Arc<ModeCell> {
        &self.shared.mode
    }

    /// Current simulation mode.
    pub fn mode(&self) -> SimulationMode {
        self.shared.mode.get()
    }

    /// Whether a run is active or still stopping.
    pub fn is_running(&self) -> bool {
        !matches!(*self.shared.phase(), Phase::Idle)
    }

    /// Threads of the current run that have not exited yet.
    pub fn active_threads(&self) -> usize {
        match &*self.shared.phase() {
            Phase::Running(run) => run.live_threads(),
            Phase::Idle | Phase::Stopping => 0,
        }
    }

    /// Id-only description of the current topology.
    pub fn layout(&self) -> Layout {
        self.shared.topology().layout()
    }

    /// Layout of the run that produced the current history. Unaffected
    /// by topology edits after that run.
    pub fn recorded_layout(&self) -> Layout {
        lock(&self.shared.recorded_layout).clone()
    }

    /// Read access to the current topology.
    pub fn with_topology<T>(&self, f: impl FnOnce(&Topology) -> T) -> T {
        f(&self.shared.topology())
    }

    /// Capture the current state without recording it.
    pub fn preview(&self) -> Snapshot {
        let elapsed = self.shared.history.elapsed();
        self.shared.topology().capture(elapsed)
    }

    // ── Topology building ───────────────────────────────────────────

    /// Add a buffer. Rejected while a run is active.
    pub fn create_buffer(&self, id: impl Into<BufferId>) -> Result<BufferId, EngineError> {
        self.shared.edit(|t| t.create_buffer(id))
    }

    /// Add a worker. Rejected while a run is active.
    pub fn create_worker(&self, id: impl Into<WorkerId>) -> Result<WorkerId, EngineError> {
        self.shared.edit(|t| t.create_worker(id))
    }

    /// Connect `buffer` as an input of `worker`.
    pub fn connect_input(&self, worker: &WorkerId, buffer: &BufferId) -> Result<(), EngineError> {
        self.shared.edit(|t| t.connect_input(worker, buffer))
    }

    /// Connect `buffer` as an output of `worker`.
    pub fn connect_output(&self, worker: &WorkerId, buffer: &BufferId) -> Result<(), EngineError> {
        self.shared.edit(|t| t.connect_output(worker, buffer))
    }

    /// Choose the buffer the generator feeds.
    pub fn set_entry(&self, buffer: &BufferId) -> Result<(), EngineError> {
        self.shared.edit(|t| t.set_entry(buffer))
    }

    /// Choose the buffer the completion monitor counts.
    pub fn set_terminal(&self, buffer: &BufferId) -> Result<(), EngineError> {
        self.shared.edit(|t| t.set_terminal(buffer))
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Validate the topology and start a run producing `item_count`
    /// items.
    pub fn start(&self, item_count: usize) -> Result<(), EngineError> {
        self.shared.start(item_count)
    }

    /// Stop the active run and join all of its threads.
    pub fn stop(&self) -> Result<StopReport, EngineError> {
        self.shared.stop()
    }

    /// Stop any run, then discard the topology and the history.
    pub fn reset(&self) -> Result<(), EngineError> {
        self.shared.reset()
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.shared.stop();
        }
    }
}

// ── Lifecycle implementation ───────────────────────────────────────

impl Shared {
    fn phase(&self) -> MutexGuard<'_, Phase> {
        lock(&self.phase)
    }

    fn topology(&self) -> MutexGuard<'_, Topology> {
        lock(&self.topology)
    }

    fn edit<T>(
        &self,
        f: impl FnOnce(&mut Topology) -> Result<T, ConfigError>,
    ) -> Result<T, EngineError> {
        let phase = self.phase();
        if !matches!(*phase, Phase::Idle) {
            return Err(TransitionError::RunActive.into());
        }
        if self.mode.get() == SimulationMode::Replay {
            return Err(TransitionError::ReplayActive.into());
        }
        let out = f(&mut self.topology())?;
        drop(phase);
        Ok(out)
    }

    fn start(self: &Arc<Self>, item_count: usize) -> Result<(), EngineError> {
        let mut phase = self.phase();
        if !matches!(*phase, Phase::Idle) {
            return Err(TransitionError::AlreadyRunning.into());
        }

        let topology = {
            let topology = self.topology();
            topology.validate()?;
            Arc::new(topology.clone())
        };
        let entry = Arc::clone(topology.entry_buffer()?);

        self.mode
            .transition(SimulationMode::Stopped, SimulationMode::Live)
            .map_err(|e| match e {
                TransitionError::ModeMismatch {
                    found: SimulationMode::Replay,
                    ..
                } => TransitionError::ReplayActive,
                TransitionError::ModeMismatch { .. } => TransitionError::AlreadyRunning,
                other => other,
            })?;

        self.history.clear();
        topology.clear_contents();
        topology.reset_workers();
        let stale = self.events.try_iter().count();
        tracing::trace!(stale, "discarded change events from previous run");

        let config = &self.config;
        let generator = Arc::new(Generator::new(
            entry,
            item_count,
            config.arrival,
            config.start_delay(),
        ));
        let mut run = ActiveRun {
            stop: StopHandle::new(),
            layout: topology.layout(),
            workers: Vec::with_capacity(topology.worker_count()),
            topology,
            generator,
            generator_thread: Arc::default(),
            recorder: None,
            monitor: None,
            started: Instant::now(),
        };
        *lock(&self.recorded_layout) = run.layout.clone();
        self.recorder.record(&run.topology, &run.layout);

        if let Err(e) = self.spawn_run(&mut run) {
            tracing::error!(error = %e, "run start aborted");
            self.halt(&mut run);
            self.mode.force(SimulationMode::Stopped);
            return Err(e);
        }

        tracing::info!(
            items = item_count,
            workers = run.workers.len(),
            seed = config.seed,
            "run started"
        );
        *phase = Phase::Running(Box::new(run));
        Ok(())
    }

    fn spawn_run(self: &Arc<Self>, run: &mut ActiveRun) -> Result<(), EngineError> {
        let config = &self.config;

        let recorder = self.recorder.clone();
        let topology = Arc::clone(&run.topology);
        let layout = run.layout.clone();
        let events = self.events.clone();
        let token = run.stop.token();
        let interval = config.snapshot_interval();
        run.recorder = Some(spawn("recorder", "lineworks-recorder".into(), move || {
            recorder.run(&topology, &layout, &events, &token, interval)
        })?);

        for (index, worker) in run.topology.workers().enumerate() {
            worker.arm();
            let worker = Arc::clone(worker);
            let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
            rng.set_stream(index as u64 + 1);
            let service = config.service;
            let token = run.stop.token();
            let name = format!("lineworks-{}", worker.id());
            let handle = spawn("worker", name, move || worker.run(service, &mut rng, &token))?;
            run.workers.push(handle);
        }

        let generator = Arc::clone(&run.generator);
        let token = run.stop.token();
        let seed = config.seed;
        let handle = spawn("generator", "lineworks-generator".into(), move || {
            generator.run(&mut ChaCha8Rng::seed_from_u64(seed), &token)
        })?;
        *lock(&run.generator_thread) = Some(handle);

        let watch = Watch {
            generator_thread: Arc::clone(&run.generator_thread),
            generator: Arc::clone(&run.generator),
            topology: Arc::clone(&run.topology),
            stop: run.stop.token(),
            grace: config.grace(),
            poll: config.poll(),
        };
        let shared = Arc::downgrade(self);
        run.monitor = Some(spawn("monitor", "lineworks-monitor".into(), move || {
            let Some(reason) = monitor::watch(watch) else {
                return;
            };
            let Some(shared) = shared.upgrade() else {
                return;
            };
            match shared.stop() {
                Ok(report) => tracing::info!(?reason, ?report, "run completed"),
                Err(e) => tracing::debug!(error = %e, "run already stopping"),
            }
        })?);

        Ok(())
    }

    fn stop(&self) -> Result<StopReport, EngineError> {
        let mut run = {
            let mut phase = self.phase();
            match std::mem::replace(&mut *phase, Phase::Stopping) {
                Phase::Running(run) => run,
                other => {
                    *phase = other;
                    return Err(TransitionError::NotRunning.into());
                }
            }
        };

        let stopping = Instant::now();
        let run_ms = millis(stopping - run.started);
        let halted = self.halt(&mut run);

        self.recorder.record(&run.topology, &run.layout);
        self.mode.force(SimulationMode::Stopped);
        self.sinks.notify_run_ended();

        let report = StopReport {
            items_produced: run.generator.produced(),
            items_forwarded: halted.forwarded,
            items_abandoned: halted.abandoned,
            workers_joined: halted.joined,
            snapshots: self.history.len(),
            run_ms,
            stop_ms: millis(stopping.elapsed()),
        };

        *self.phase() = Phase::Idle;
        self.phase_changed.notify_all();
        tracing::info!(
            produced = report.items_produced,
            snapshots = report.snapshots,
            stop_ms = report.stop_ms,
            "run stopped"
        );
        Ok(report)
    }

    /// Signal every thread of `run` and join them. The monitor is not
    /// joined when this runs on the monitor thread itself.
    fn halt(&self, run: &mut ActiveRun) -> Halted {
        run.generator.request_stop();
        for worker in run.topology.workers() {
            worker.request_stop();
        }
        run.stop.trigger();

        let mut halted = Halted::default();
        for handle in run.workers.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_owned();
            match handle.join() {
                Ok(report) => {
                    halted.joined += 1;
                    halted.forwarded += report.processed;
                    halted.abandoned += usize::from(report.abandoned);
                }
                Err(_) => tracing::warn!(thread = %name, "worker thread panicked"),
            }
        }

        let generator = lock(&run.generator_thread).take();
        if let Some(handle) = generator {
            if handle.join().is_err() {
                tracing::warn!("generator thread panicked");
            }
        }

        if let Some(handle) = run.monitor.take() {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                tracing::warn!("monitor thread panicked");
            }
        }

        if let Some(handle) = run.recorder.take() {
            match handle.join() {
                Ok(recorded) => tracing::debug!(recorded, "recorder joined"),
                Err(_) => tracing::warn!("recorder thread panicked"),
            }
        }
        halted
    }

    fn reset(&self) -> Result<(), EngineError> {
        let _phase = loop {
            match self.stop() {
                Ok(_) | Err(EngineError::Transition(TransitionError::NotRunning)) => {}
                Err(e) => return Err(e),
            }
            let mut phase = self.phase();
            while matches!(*phase, Phase::Stopping) {
                phase = self
                    .phase_changed
                    .wait(phase)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if matches!(*phase, Phase::Idle) {
                break phase;
            }
        };

        {
            let mut topology = self.topology();
            topology.clear_contents();
            topology.reset_workers();
            *topology = Topology::with_notifier(self.notifier.clone());
        }
        self.history.clear();
        *lock(&self.recorded_layout) = Layout::default();
        self.events.try_iter().for_each(drop);
        tracing::info!("engine reset");
        Ok(())
    }
}

fn spawn<T, F>(role: &'static str, name: String, f: F) -> Result<JoinHandle<T>, EngineError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    thread::Builder::new()
        .name(name)
        .spawn(f)
        .map_err(|source| EngineError::Spawn { role, source })
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
