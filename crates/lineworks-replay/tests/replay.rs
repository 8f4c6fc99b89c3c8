//! Replay pacing, refusal rules, and interruption.

use std::sync::Arc;
use std::time::Duration;

use lineworks_core::{History, ModeCell, SimulationMode, SinkHub, TransitionError};
use lineworks_replay::{ReplayConfig, ReplayError, ReplayOutcome, ReplayPacing, Replayer};
use lineworks_test_utils::fixtures::{history_at, line_layout, wait_until};
use lineworks_test_utils::RecordingSink;

struct Rig {
    replayer: Replayer,
    mode: Arc<ModeCell>,
    sink: RecordingSink,
}

fn rig(config: ReplayConfig) -> Rig {
    let sinks = Arc::new(SinkHub::new());
    let sink = RecordingSink::new();
    sinks.subscribe(sink.boxed());
    let mode = Arc::new(ModeCell::new());
    Rig {
        replayer: Replayer::new(config, sinks, Arc::clone(&mode)),
        mode,
        sink,
    }
}

fn no_trailing() -> ReplayConfig {
    ReplayConfig {
        trailing_ms: 0,
        ..ReplayConfig::default()
    }
}

#[test]
fn recorded_pacing_reproduces_relative_timing() {
    let rig = rig(no_trailing());
    let history = history_at(&[0, 100, 350]);
    rig.replayer.replay(&history, line_layout(1)).unwrap();
    assert!(rig.sink.wait_for_run_end(Duration::from_secs(5)));

    let arrivals = rig.sink.arrivals();
    assert_eq!(arrivals.len(), 3);
    let rel: Vec<Duration> = arrivals.iter().map(|t| *t - arrivals[0]).collect();
    let tolerance = Duration::from_millis(80);
    for (got, want) in rel.iter().zip([0u64, 100, 350]) {
        let want = Duration::from_millis(want);
        assert!(
            *got + Duration::from_millis(5) >= want && *got <= want + tolerance,
            "arrival at {got:?}, expected about {want:?}"
        );
    }

    let frames = rig.sink.frames();
    assert!(frames.iter().all(|f| f.mode == SimulationMode::Replay));
    assert_eq!(frames[2].queue(&"Q0".into()).unwrap().size, 2);
    assert_eq!(rig.mode.get(), SimulationMode::Stopped);
    assert_eq!(rig.sink.run_ended_count(), 1);
}

#[test]
fn fixed_pacing_ignores_recorded_gaps() {
    let rig = rig(ReplayConfig {
        pacing: ReplayPacing::Fixed { interval_ms: 10 },
        trailing_ms: 0,
    });
    let history = history_at(&[0, 30_000, 60_000]);
    rig.replayer.replay(&history, line_layout(1)).unwrap();
    assert!(rig.sink.wait_for_run_end(Duration::from_secs(5)));

    let arrivals = rig.sink.arrivals();
    assert_eq!(arrivals.len(), 3);
    assert!(arrivals[2] - arrivals[0] < Duration::from_secs(2));
}

#[test]
fn refusals() {
    let rig = rig(no_trailing());

    assert!(matches!(
        rig.replayer.replay(&History::new(), line_layout(1)),
        Err(ReplayError::EmptyHistory)
    ));
    assert!(matches!(
        rig.replayer.stop_replay(),
        Err(ReplayError::Transition(TransitionError::NotReplaying))
    ));

    rig.mode.force(SimulationMode::Live);
    assert!(matches!(
        rig.replayer.replay(&history_at(&[0]), line_layout(1)),
        Err(ReplayError::Transition(TransitionError::LiveRunActive))
    ));
    rig.mode.force(SimulationMode::Stopped);

    let long = history_at(&[0, 60_000]);
    rig.replayer.replay(&long, line_layout(1)).unwrap();
    assert!(matches!(
        rig.replayer.replay(&long, line_layout(1)),
        Err(ReplayError::Transition(TransitionError::ReplayActive))
    ));
    rig.replayer.stop_replay().unwrap();
}

#[test]
fn stop_replay_interrupts_and_notifies_once() {
    let rig = rig(no_trailing());
    let history = history_at(&[0, 60_000]);
    rig.replayer.replay(&history, line_layout(1)).unwrap();
    assert!(wait_until(Duration::from_secs(5), || rig.sink.frame_count() == 1));
    assert!(rig.replayer.is_replaying());

    assert_eq!(rig.replayer.stop_replay().unwrap(), ReplayOutcome::Interrupted);
    assert_eq!(rig.mode.get(), SimulationMode::Stopped);
    assert_eq!(rig.sink.run_ended_count(), 1);
    assert_eq!(rig.sink.frame_count(), 1);
    assert_eq!(
        rig.replayer.cursor().unwrap().timestamp(),
        Duration::ZERO
    );
    assert!(rig.replayer.stop_replay().is_err());
}

#[test]
fn natural_end_waits_the_trailing_delay() {
    let rig = rig(ReplayConfig {
        trailing_ms: 150,
        ..ReplayConfig::default()
    });
    rig.replayer.replay(&history_at(&[0]), line_layout(1)).unwrap();
    assert!(wait_until(Duration::from_secs(5), || rig.sink.frame_count() == 1));
    assert_eq!(rig.mode.get(), SimulationMode::Replay);

    assert!(rig.sink.wait_for_run_end(Duration::from_secs(5)));
    assert_eq!(rig.mode.get(), SimulationMode::Stopped);
    assert!(rig.replayer.stop_replay().is_err());
    assert_eq!(rig.sink.run_ended_count(), 1);

    // A finished session does not block the next one.
    rig.replayer.replay(&history_at(&[0, 5]), line_layout(1)).unwrap();
    assert!(wait_until(Duration::from_secs(5), || rig.sink.run_ended_count() == 2));
}
