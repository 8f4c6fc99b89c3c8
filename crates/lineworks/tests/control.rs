//! End-to-end tests of the `Simulation` control surface.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use lineworks::prelude::*;
use lineworks::engine::EngineError;
use lineworks::replay::ReplayError;
use lineworks::types::{SinkError, TransitionError};
use lineworks_test_utils::fixtures::wait_until;
use lineworks_test_utils::{FailingSink, RecordingSink};

const TIMEOUT: Duration = Duration::from_secs(10);

fn config(extra: &str) -> SimConfig {
    let base = r#"
        [engine]
        seed = 3
        arrival = { min_ms = 2, max_ms = 6 }
        service = { min_ms = 2, max_ms = 6 }
        grace_ms = 30
        poll_ms = 10
    "#;
    SimConfig::from_toml_str(&format!("{base}\n{extra}")).unwrap()
}

fn slow_config() -> SimConfig {
    config(
        r#"
        [replay]
        trailing_ms = 60000
        "#,
    )
}

fn line_blueprint() -> Blueprint {
    Blueprint::from_json_str(
        r#"{
            "buffers": ["Q0", "Q1", "Q2"],
            "workers": ["M1", "M2"],
            "connections": [
                { "worker": "M1", "buffer": "Q0", "direction": "input" },
                { "worker": "M1", "buffer": "Q1", "direction": "output" },
                { "worker": "M2", "buffer": "Q1", "direction": "input" },
                { "worker": "M2", "buffer": "Q2", "direction": "output" }
            ]
        }"#,
    )
    .unwrap()
}

fn sim_with(config: SimConfig) -> (Simulation, RecordingSink) {
    let sim = Simulation::new(config).unwrap();
    sim.apply_blueprint(&line_blueprint()).unwrap();
    let sink = RecordingSink::new();
    sim.subscribe(sink.boxed());
    (sim, sink)
}

fn q(id: &str) -> BufferId {
    BufferId::from(id)
}

#[test]
fn live_run_moves_every_item_to_the_terminal() {
    let (sim, sink) = sim_with(config(""));
    sim.start(4).unwrap();
    assert_eq!(sim.mode(), SimulationMode::Live);

    assert!(sink.wait_for_run_end(TIMEOUT));
    assert!(wait_until(TIMEOUT, || !sim.engine().is_running()));
    assert_eq!(sim.mode(), SimulationMode::Stopped);

    let state = sim.latest_state();
    assert_eq!(state.queue(&q("Q2")).unwrap().size, 4);
    assert_eq!(state.queue(&q("Q0")).unwrap().size, 0);
    for machine in &state.machines {
        assert_eq!(machine.state, WorkerState::Idle);
    }
    assert_eq!(sink.run_ended_count(), 1);
    assert!(sink.frame_count() >= 2);
    assert!(sink.frames().iter().all(|f| f.mode == SimulationMode::Live));
}

#[test]
fn replay_after_a_run_publishes_every_entry_in_replay_mode() {
    let (sim, sink) = sim_with(config(
        r#"
        [replay]
        pacing = { mode = "fixed", interval_ms = 1 }
        trailing_ms = 0
        "#,
    ));
    sim.start(3).unwrap();
    assert!(sink.wait_for_run_end(TIMEOUT));
    assert!(wait_until(TIMEOUT, || !sim.engine().is_running()));
    let live_frames = sink.frame_count();
    let recorded = sim.history().len();

    sim.replay().unwrap();
    assert!(wait_until(TIMEOUT, || sink.run_ended_count() == 2));
    assert_eq!(sim.mode(), SimulationMode::Stopped);

    let replayed: Vec<_> = sink.frames().split_off(live_frames);
    assert_eq!(replayed.len(), recorded);
    assert!(replayed.iter().all(|f| f.mode == SimulationMode::Replay));
    assert_eq!(
        replayed.last().unwrap().queue(&q("Q2")).unwrap().size,
        3
    );
    // Replaying does not touch the recording.
    assert_eq!(sim.history().len(), recorded);
}

#[test]
fn replay_is_refused_during_a_live_run() {
    let mut cfg = config("");
    cfg.engine.grace_ms = 60_000;
    let (sim, _sink) = sim_with(cfg);
    sim.start(1).unwrap();

    assert!(matches!(
        sim.replay(),
        Err(ControlError::Replay(ReplayError::Transition(
            TransitionError::LiveRunActive
        )))
    ));
    assert!(matches!(
        sim.create_buffer("Q9"),
        Err(ControlError::Engine(EngineError::Transition(
            TransitionError::RunActive
        )))
    ));
    assert_eq!(sim.latest_state().mode, SimulationMode::Live);

    sim.stop().unwrap();
    assert_eq!(sim.mode(), SimulationMode::Stopped);
}

#[test]
fn start_is_refused_during_a_replay() {
    let (sim, sink) = sim_with(slow_config());
    sim.start(2).unwrap();
    assert!(sink.wait_for_run_end(TIMEOUT));
    assert!(wait_until(TIMEOUT, || !sim.engine().is_running()));

    sim.replay().unwrap();
    assert!(matches!(
        sim.start(1),
        Err(ControlError::Engine(EngineError::Transition(
            TransitionError::ReplayActive
        )))
    ));
    assert!(matches!(
        sim.replay(),
        Err(ControlError::Replay(ReplayError::Transition(
            TransitionError::ReplayActive
        )))
    ));

    // The trailing delay keeps the replay parked on its last entry.
    let total = sim.history().len();
    assert!(wait_until(TIMEOUT, || sink.frame_count() >= total * 2));
    let state = sim.latest_state();
    assert_eq!(state.mode, SimulationMode::Replay);
    assert_eq!(state.queue(&q("Q2")).unwrap().size, 2);

    assert_eq!(sim.stop_replay().unwrap(), ReplayOutcome::Interrupted);
    assert_eq!(sim.mode(), SimulationMode::Stopped);
    assert_eq!(sink.run_ended_count(), 2);
}

#[test]
fn reset_ends_a_replay_and_clears_everything() {
    let (sim, sink) = sim_with(slow_config());
    sim.start(2).unwrap();
    assert!(sink.wait_for_run_end(TIMEOUT));
    assert!(wait_until(TIMEOUT, || !sim.engine().is_running()));
    sim.replay().unwrap();

    sim.reset().unwrap();
    assert_eq!(sim.mode(), SimulationMode::Stopped);
    assert!(sim.history().is_empty());
    assert_eq!(sim.blueprint(), Blueprint::default());
    assert!(sim.latest_state().queues.is_empty());
    assert!(matches!(
        sim.replay(),
        Err(ControlError::Replay(ReplayError::EmptyHistory))
    ));
}

#[test]
fn reset_during_a_live_run_stops_it() {
    let mut cfg = config("");
    cfg.engine.grace_ms = 60_000;
    let (sim, sink) = sim_with(cfg);
    sim.start(2).unwrap();

    sim.reset().unwrap();
    assert!(!sim.engine().is_running());
    assert_eq!(sim.mode(), SimulationMode::Stopped);
    assert_eq!(sink.run_ended_count(), 1);
    assert_eq!(sim.engine().active_threads(), 0);
}

#[test]
fn failing_viewer_is_dropped_without_disturbing_others() {
    let (sim, sink) = sim_with(config(""));
    let failing = FailingSink::new(SinkError::Disconnected);
    let attempts = Arc::clone(&failing.attempts);
    assert_eq!(sim.subscribe(Box::new(failing)), 2);

    sim.start(2).unwrap();
    assert!(sink.wait_for_run_end(TIMEOUT));

    assert_eq!(attempts.load(Ordering::Acquire), 1);
    assert_eq!(sim.engine().sinks().len(), 1);
    assert_eq!(sim.latest_state().queue(&q("Q2")).unwrap().size, 2);
}

#[test]
fn stop_report_accounts_for_the_run() {
    let (sim, sink) = sim_with(config(""));
    sim.start(3).unwrap();
    assert!(sink.wait_for_run_end(TIMEOUT));
    assert!(wait_until(TIMEOUT, || !sim.engine().is_running()));

    // Completed runs cannot be stopped twice.
    assert!(matches!(
        sim.stop(),
        Err(ControlError::Engine(EngineError::Transition(
            TransitionError::NotRunning
        )))
    ));

    sim.start(3).unwrap();
    let report = sim.stop().unwrap();
    assert!(report.items_produced <= 3);
    assert_eq!(report.workers_joined, 2);
    assert_eq!(sink.run_ended_count(), 2);
}

#[test]
fn replay_shows_the_recorded_topology_after_edits() {
    let (sim, sink) = sim_with(slow_config());
    sim.start(1).unwrap();
    assert!(sink.wait_for_run_end(TIMEOUT));
    assert!(wait_until(TIMEOUT, || !sim.engine().is_running()));

    sim.create_buffer("Q9").unwrap();
    assert_eq!(sim.latest_state().queues.len(), 3);

    let live_frames = sink.frame_count();
    sim.replay().unwrap();
    assert!(wait_until(TIMEOUT, || sink.frame_count() > live_frames));
    let first_replayed = &sink.frames()[live_frames];
    assert_eq!(first_replayed.mode, SimulationMode::Replay);
    assert!(first_replayed.queue(&q("Q9")).is_none());

    assert!(matches!(
        sim.create_buffer("Q10"),
        Err(ControlError::Engine(EngineError::Transition(
            TransitionError::ReplayActive
        )))
    ));
    sim.stop_replay().unwrap();
    sim.create_buffer("Q10").unwrap();
}
