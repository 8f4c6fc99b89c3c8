//! Immutable, timestamped captures of worker and buffer state.

use std::time::Duration;

use indexmap::IndexMap;

use crate::id::{BufferId, WorkerId};
use crate::item::Color;
use crate::state::WorkerState;

/// One consistent view of every worker and buffer at a point in time.
///
/// Built once by the recorder (or by hand in tests) and then shared as
/// `Arc<Snapshot>`; there is no way to mutate a snapshot after
/// construction. Entries keep the order in which they were added, which
/// is topology creation order for recorded snapshots.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use lineworks_core::{Color, Snapshot, WorkerState};
///
/// let snap = Snapshot::new(Duration::from_millis(100))
///     .with_worker("M1".into(), WorkerState::Busy, Color::Rgb { r: 255, g: 0, b: 0 })
///     .with_buffer("Q0".into(), vec![Color::Neutral, Color::Neutral]);
///
/// assert_eq!(snap.buffer_size(&"Q0".into()), Some(2));
/// assert_eq!(snap.worker_state(&"M1".into()), Some(WorkerState::Busy));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    worker_colors: IndexMap<WorkerId, Color>,
    worker_states: IndexMap<WorkerId, WorkerState>,
    buffer_contents: IndexMap<BufferId, Vec<Color>>,
    timestamp: Duration,
}

impl Snapshot {
    /// An empty snapshot taken at `timestamp` (offset from the history origin).
    pub fn new(timestamp: Duration) -> Self {
        Self {
            worker_colors: IndexMap::new(),
            worker_states: IndexMap::new(),
            buffer_contents: IndexMap::new(),
            timestamp,
        }
    }

    /// Add a worker's state and colour.
    pub fn with_worker(mut self, id: WorkerId, state: WorkerState, color: Color) -> Self {
        self.worker_colors.insert(id.clone(), color);
        self.worker_states.insert(id, state);
        self
    }

    /// Add a buffer's contents, head first.
    pub fn with_buffer(mut self, id: BufferId, contents: Vec<Color>) -> Self {
        self.buffer_contents.insert(id, contents);
        self
    }

    /// Offset from the history origin at which this snapshot was taken.
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    pub(crate) fn set_timestamp(&mut self, timestamp: Duration) {
        self.timestamp = timestamp;
    }

    /// Colour of one worker.
    pub fn worker_color(&self, id: &WorkerId) -> Option<Color> {
        self.worker_colors.get(id).copied()
    }

    /// State of one worker.
    pub fn worker_state(&self, id: &WorkerId) -> Option<WorkerState> {
        self.worker_states.get(id).copied()
    }

    /// Number of items in one buffer.
    pub fn buffer_size(&self, id: &BufferId) -> Option<usize> {
        self.buffer_contents.get(id).map(Vec::len)
    }

    /// Item colours in one buffer, head first.
    pub fn buffer_contents(&self, id: &BufferId) -> Option<&[Color]> {
        self.buffer_contents.get(id).map(Vec::as_slice)
    }
}
