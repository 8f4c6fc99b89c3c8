//! The control surface: one object driving the live engine and the
//! replayer over a shared history, sink hub, and mode.

use std::sync::Arc;

use lineworks_core::{
    BufferId, Direction, EventSink, History, ModeCell, SimulationMode, SinkHub, StateView,
    TransitionError, WorkerId,
};
use lineworks_engine::{Orchestrator, StopReport};
use lineworks_replay::{ReplayError, ReplayOutcome, Replayer};

use crate::blueprint::Blueprint;
use crate::config::SimConfig;
use crate::error::ControlError;

/// A production line with live runs and replay.
///
/// All methods take `&self`; the simulation can be shared across
/// threads behind an `Arc`.
pub struct Simulation {
    config: SimConfig,
    engine: Orchestrator,
    replayer: Replayer,
}

// Compile-time assertion: Simulation must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Simulation>();
};

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("engine", &self.engine)
            .field("replayer", &self.replayer)
            .finish()
    }
}

impl Simulation {
    /// Validate `config` and build an empty line.
    pub fn new(config: SimConfig) -> Result<Self, ControlError> {
        config.validate()?;
        let history = Arc::new(History::new());
        let sinks = Arc::new(SinkHub::new());
        let mode = Arc::new(ModeCell::new());
        let engine = Orchestrator::with_parts(
            config.engine.clone(),
            history,
            Arc::clone(&sinks),
            Arc::clone(&mode),
        )?;
        let replayer = Replayer::new(config.replay.clone(), sinks, mode);
        Ok(Self {
            config,
            engine,
            replayer,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The live engine, for lower-level access.
    pub fn engine(&self) -> &Orchestrator {
        &self.engine
    }

    /// Recorded history of the current or last run.
    pub fn history(&self) -> &Arc<History> {
        self.engine.history()
    }

    /// Current mode.
    pub fn mode(&self) -> SimulationMode {
        self.engine.mode()
    }

    /// Add a viewer. Returns the subscriber count.
    pub fn subscribe(&self, sink: Box<dyn EventSink>) -> usize {
        self.engine.sinks().subscribe(sink)
    }

    // ── Topology ────────────────────────────────────────────────────

    /// Add a buffer.
    pub fn create_buffer(&self, id: impl Into<BufferId>) -> Result<BufferId, ControlError> {
        Ok(self.engine.create_buffer(id)?)
    }

    /// Add a worker.
    pub fn create_worker(&self, id: impl Into<WorkerId>) -> Result<WorkerId, ControlError> {
        Ok(self.engine.create_worker(id)?)
    }

    /// Connect `buffer` as an input of `worker`.
    pub fn connect_input(&self, worker: &WorkerId, buffer: &BufferId) -> Result<(), ControlError> {
        Ok(self.engine.connect_input(worker, buffer)?)
    }

    /// Connect `buffer` as an output of `worker`.
    pub fn connect_output(&self, worker: &WorkerId, buffer: &BufferId) -> Result<(), ControlError> {
        Ok(self.engine.connect_output(worker, buffer)?)
    }

    /// Choose the buffer the generator feeds.
    pub fn set_entry(&self, buffer: &BufferId) -> Result<(), ControlError> {
        Ok(self.engine.set_entry(buffer)?)
    }

    /// Choose the buffer the completion monitor counts.
    pub fn set_terminal(&self, buffer: &BufferId) -> Result<(), ControlError> {
        Ok(self.engine.set_terminal(buffer)?)
    }

    /// Reset, then build the topology described by `blueprint`.
    pub fn apply_blueprint(&self, blueprint: &Blueprint) -> Result<(), ControlError> {
        self.reset()?;
        for id in &blueprint.buffers {
            self.engine.create_buffer(id.clone())?;
        }
        for id in &blueprint.workers {
            self.engine.create_worker(id.clone())?;
        }
        for c in &blueprint.connections {
            match c.direction {
                Direction::Input => self.engine.connect_input(&c.worker, &c.buffer)?,
                Direction::Output => self.engine.connect_output(&c.worker, &c.buffer)?,
            }
        }
        if let Some(entry) = &blueprint.entry {
            self.engine.set_entry(entry)?;
        }
        if let Some(terminal) = &blueprint.terminal {
            self.engine.set_terminal(terminal)?;
        }
        tracing::info!(
            buffers = blueprint.buffers.len(),
            workers = blueprint.workers.len(),
            connections = blueprint.connections.len(),
            "blueprint applied"
        );
        Ok(())
    }

    /// Describe the current topology.
    pub fn blueprint(&self) -> Blueprint {
        Blueprint::from_layout(&self.engine.layout())
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Start a live run producing `item_count` items.
    pub fn start(&self, item_count: usize) -> Result<(), ControlError> {
        Ok(self.engine.start(item_count)?)
    }

    /// Stop the live run.
    pub fn stop(&self) -> Result<StopReport, ControlError> {
        Ok(self.engine.stop()?)
    }

    /// Replay the recorded history over the topology it was recorded on.
    pub fn replay(&self) -> Result<(), ControlError> {
        Ok(self
            .replayer
            .replay(self.engine.history(), self.engine.recorded_layout())?)
    }

    /// Interrupt the replay.
    pub fn stop_replay(&self) -> Result<ReplayOutcome, ControlError> {
        Ok(self.replayer.stop_replay()?)
    }

    /// End any replay or run, then clear the topology and history.
    pub fn reset(&self) -> Result<(), ControlError> {
        match self.replayer.stop_replay() {
            Ok(_) | Err(ReplayError::Transition(TransitionError::NotReplaying)) => {}
            Err(e) => return Err(e.into()),
        }
        self.engine.reset()?;
        Ok(())
    }

    /// The most relevant current state: the replay cursor while
    /// replaying, otherwise the latest recorded entry, otherwise an
    /// unrecorded capture of the topology.
    pub fn latest_state(&self) -> StateView {
        let mode = self.mode();
        let snapshot = (mode == SimulationMode::Replay)
            .then(|| self.replayer.cursor())
            .flatten()
            .or_else(|| self.engine.history().latest());
        match snapshot {
            Some(snapshot) => {
                StateView::project(&snapshot, &self.engine.recorded_layout(), mode)
            }
            None => StateView::project(&self.engine.preview(), &self.engine.layout(), mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineworks_core::{ConfigError, WorkerState};
    use lineworks_engine::EngineError;

    fn line() -> Blueprint {
        Blueprint::from_json_str(
            r#"{
                "buffers": ["Q0", "Q1"],
                "workers": ["M1"],
                "connections": [
                    { "worker": "M1", "buffer": "Q0", "direction": "input" },
                    { "worker": "M1", "buffer": "Q1", "direction": "output" }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn latest_state_before_any_run_is_a_preview() {
        let sim = Simulation::new(SimConfig::default()).unwrap();
        sim.apply_blueprint(&line()).unwrap();

        let state = sim.latest_state();
        assert_eq!(state.mode, SimulationMode::Stopped);
        assert_eq!(state.queues.len(), 2);
        assert_eq!(
            state.machine(&"M1".into()).unwrap().state,
            WorkerState::Idle
        );
        assert!(sim.history().is_empty());
    }

    #[test]
    fn blueprint_replaces_the_previous_topology() {
        let sim = Simulation::new(SimConfig::default()).unwrap();
        sim.create_buffer("OLD").unwrap();
        sim.apply_blueprint(&line()).unwrap();

        let exported = sim.blueprint();
        assert_eq!(exported.buffers, line().buffers);
        assert_eq!(exported.connections, line().connections);
    }

    #[test]
    fn blueprint_errors_surface_as_config_errors() {
        let sim = Simulation::new(SimConfig::default()).unwrap();
        let mut bp = line();
        bp.buffers.push("Q0".into());
        let err = sim.apply_blueprint(&bp).unwrap_err();
        assert!(matches!(
            err,
            ControlError::Engine(EngineError::Config(ConfigError::DuplicateBuffer { .. }))
        ));
    }

    #[test]
    fn replay_and_stop_replay_refusals() {
        let sim = Simulation::new(SimConfig::default()).unwrap();
        assert!(matches!(
            sim.replay(),
            Err(ControlError::Replay(ReplayError::EmptyHistory))
        ));
        assert!(matches!(
            sim.stop_replay(),
            Err(ControlError::Replay(ReplayError::Transition(
                TransitionError::NotReplaying
            )))
        ));
        // Nothing to stop is not an error for reset.
        sim.reset().unwrap();
        assert_eq!(sim.mode(), SimulationMode::Stopped);
    }
}
