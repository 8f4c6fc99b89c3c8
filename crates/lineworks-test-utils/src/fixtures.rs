//! Layout and history fixtures plus polling helpers.

use std::time::{Duration, Instant};

use lineworks_core::{
    BufferId, Color, History, Layout, Snapshot, WorkerLayout, WorkerState,
};

/// `Q0 → M1 → Q1 → … → Mn → Qn`.
pub fn line_layout(stations: usize) -> Layout {
    let buffers: Vec<BufferId> = (0..=stations).map(|i| BufferId::from(format!("Q{i}"))).collect();
    let workers = (1..=stations)
        .map(|i| WorkerLayout {
            id: format!("M{i}").into(),
            inputs: vec![buffers[i - 1].clone()],
            outputs: vec![buffers[i].clone()],
        })
        .collect();
    Layout { workers, buffers }
}

/// A history whose entries carry the given millisecond offsets. Entry
/// `i` holds `i` neutral items in `Q0` so entries are distinguishable.
pub fn history_at(offsets_ms: &[u64]) -> History {
    let history = History::new();
    for (i, ms) in offsets_ms.iter().enumerate() {
        history.append(
            Snapshot::new(Duration::from_millis(*ms))
                .with_worker("M1".into(), WorkerState::Idle, Color::Neutral)
                .with_buffer("Q0".into(), vec![Color::Neutral; i]),
        );
    }
    history
}

/// Poll `cond` every 2 ms until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}
