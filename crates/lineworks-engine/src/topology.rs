//! The owned graph of buffers and workers.
//!
//! A [`Topology`] is built while no run is active and frozen behind an
//! `Arc` for the duration of a run, so reads on the hot path need no
//! lock. Cloning shares the underlying buffers and workers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use lineworks_core::{
    BufferId, ConfigError, Direction, Layout, Snapshot, WorkerId, WorkerLayout,
};

use crate::buffer::Buffer;
use crate::notify::ChangeNotifier;
use crate::worker::Worker;

/// Why the drain check decided the run is complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainReason {
    /// The terminal buffer holds every produced item.
    TerminalComplete,
    /// Every non-terminal buffer is empty; items were lost to fan-in or
    /// multiplied by fan-out.
    Drained,
}

/// Buffers, workers, and the entry/terminal designation.
#[derive(Clone, Debug, Default)]
pub struct Topology {
    buffers: IndexMap<BufferId, Arc<Buffer>>,
    workers: IndexMap<WorkerId, Arc<Worker>>,
    entry: Option<BufferId>,
    terminal: Option<BufferId>,
    notifier: ChangeNotifier,
    /// Bumped on every put and take in any buffer.
    activity: Arc<AtomicU64>,
}

impl Topology {
    /// An empty topology that reports to nobody.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty topology whose buffers and workers report to `notifier`.
    pub fn with_notifier(notifier: ChangeNotifier) -> Self {
        Self {
            notifier,
            ..Self::default()
        }
    }

    // ── Building ────────────────────────────────────────────────────

    /// Add a buffer.
    pub fn create_buffer(&mut self, id: impl Into<BufferId>) -> Result<BufferId, ConfigError> {
        let id = id.into();
        if self.buffers.contains_key(&id) {
            return Err(ConfigError::DuplicateBuffer { id });
        }
        let buffer = Buffer::wired(id.clone(), self.notifier.clone(), Arc::clone(&self.activity));
        self.buffers.insert(id.clone(), Arc::new(buffer));
        Ok(id)
    }

    /// Add a worker with no connections.
    pub fn create_worker(&mut self, id: impl Into<WorkerId>) -> Result<WorkerId, ConfigError> {
        let id = id.into();
        if self.workers.contains_key(&id) {
            return Err(ConfigError::DuplicateWorker { id });
        }
        let worker = Worker::wired(id.clone(), self.notifier.clone());
        self.workers.insert(id.clone(), Arc::new(worker));
        Ok(id)
    }

    /// Make `buffer` an input of `worker`.
    pub fn connect_input(
        &mut self,
        worker: &WorkerId,
        buffer: &BufferId,
    ) -> Result<(), ConfigError> {
        self.connect(worker, buffer, Direction::Input)
    }

    /// Make `buffer` an output of `worker`.
    pub fn connect_output(
        &mut self,
        worker: &WorkerId,
        buffer: &BufferId,
    ) -> Result<(), ConfigError> {
        self.connect(worker, buffer, Direction::Output)
    }

    fn connect(
        &mut self,
        worker_id: &WorkerId,
        buffer_id: &BufferId,
        direction: Direction,
    ) -> Result<(), ConfigError> {
        let worker = self.worker(worker_id)?;
        let buffer = self.buffer(buffer_id)?;
        let existing = match direction {
            Direction::Input => worker.input_ids(),
            Direction::Output => worker.output_ids(),
        };
        if existing.contains(buffer_id) {
            return Err(ConfigError::DuplicateConnection {
                worker: worker_id.clone(),
                buffer: buffer_id.clone(),
                direction,
            });
        }
        match direction {
            Direction::Input => worker.connect_input(Arc::clone(buffer)),
            Direction::Output => worker.connect_output(Arc::clone(buffer)),
        }
        Ok(())
    }

    /// Designate the buffer the generator feeds. Defaults to the first
    /// buffer created.
    pub fn set_entry(&mut self, id: &BufferId) -> Result<(), ConfigError> {
        self.buffer(id)?;
        self.entry = Some(id.clone());
        Ok(())
    }

    /// Designate the buffer the drain check counts. Defaults to the last
    /// buffer created.
    pub fn set_terminal(&mut self, id: &BufferId) -> Result<(), ConfigError> {
        self.buffer(id)?;
        self.terminal = Some(id.clone());
        Ok(())
    }

    // ── Lookup ──────────────────────────────────────────────────────

    /// Buffer by id.
    pub fn buffer(&self, id: &BufferId) -> Result<&Arc<Buffer>, ConfigError> {
        self.buffers
            .get(id)
            .ok_or_else(|| ConfigError::UnknownBuffer { id: id.clone() })
    }

    /// Worker by id.
    pub fn worker(&self, id: &WorkerId) -> Result<&Arc<Worker>, ConfigError> {
        self.workers
            .get(id)
            .ok_or_else(|| ConfigError::UnknownWorker { id: id.clone() })
    }

    /// Buffers in creation order.
    pub fn buffers(&self) -> impl Iterator<Item = &Arc<Buffer>> + '_ {
        self.buffers.values()
    }

    /// Workers in creation order.
    pub fn workers(&self) -> impl Iterator<Item = &Arc<Worker>> + '_ {
        self.workers.values()
    }

    /// Number of workers.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Whether nothing has been created yet.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty() && self.workers.is_empty()
    }

    /// Effective entry buffer id.
    pub fn entry_id(&self) -> Option<&BufferId> {
        self.entry.as_ref().or_else(|| self.buffers.keys().next())
    }

    /// Effective terminal buffer id.
    pub fn terminal_id(&self) -> Option<&BufferId> {
        self.terminal.as_ref().or_else(|| self.buffers.keys().last())
    }

    pub(crate) fn entry_buffer(&self) -> Result<&Arc<Buffer>, ConfigError> {
        self.buffer(self.entry_id().ok_or(ConfigError::NoBuffers)?)
    }

    // ── Validation ──────────────────────────────────────────────────

    /// Check that a run can start: at least one buffer, every worker has
    /// inputs and outputs, entry and terminal exist, and no worker feeds
    /// back into itself.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffers.is_empty() {
            return Err(ConfigError::NoBuffers);
        }
        for (id, worker) in &self.workers {
            if worker.input_ids().is_empty() {
                return Err(ConfigError::MissingInput { worker: id.clone() });
            }
            if worker.output_ids().is_empty() {
                return Err(ConfigError::MissingOutput { worker: id.clone() });
            }
        }
        for id in [&self.entry, &self.terminal].into_iter().flatten() {
            self.buffer(id)?;
        }
        self.check_acyclic()
    }

    /// Depth-first search over worker → output buffer → consuming worker.
    fn check_acyclic(&self) -> Result<(), ConfigError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Open,
            Done,
        }

        let mut consumers: IndexMap<BufferId, Vec<usize>> = IndexMap::new();
        for (idx, worker) in self.workers.values().enumerate() {
            for input in worker.input_ids() {
                consumers.entry(input).or_default().push(idx);
            }
        }
        let successors: Vec<Vec<usize>> = self
            .workers
            .values()
            .map(|w| {
                w.output_ids()
                    .iter()
                    .filter_map(|b| consumers.get(b))
                    .flatten()
                    .copied()
                    .collect()
            })
            .collect();

        let ids: Vec<&WorkerId> = self.workers.keys().collect();
        let mut marks = vec![Mark::New; successors.len()];
        for root in 0..successors.len() {
            if marks[root] != Mark::New {
                continue;
            }
            // Explicit stack of (node, next successor index).
            let mut stack = vec![(root, 0usize)];
            marks[root] = Mark::Open;
            while let Some(top) = stack.last_mut() {
                let node = top.0;
                let Some(&succ) = successors[node].get(top.1) else {
                    marks[node] = Mark::Done;
                    stack.pop();
                    continue;
                };
                top.1 += 1;
                match marks[succ] {
                    Mark::Open => {
                        return Err(ConfigError::Cycle {
                            worker: ids[succ].clone(),
                        })
                    }
                    Mark::New => {
                        marks[succ] = Mark::Open;
                        stack.push((succ, 0));
                    }
                    Mark::Done => {}
                }
            }
        }
        Ok(())
    }

    // ── Run support ─────────────────────────────────────────────────

    /// Id-only description for projections.
    pub fn layout(&self) -> Layout {
        Layout {
            workers: self
                .workers
                .values()
                .map(|w| WorkerLayout {
                    id: w.id().clone(),
                    inputs: w.input_ids(),
                    outputs: w.output_ids(),
                })
                .collect(),
            buffers: self.buffers.keys().cloned().collect(),
        }
    }

    /// Read every worker status and buffer content into a snapshot.
    pub fn capture(&self, timestamp: Duration) -> Snapshot {
        let snapshot = self.workers.values().fold(Snapshot::new(timestamp), |s, w| {
            let status = w.status();
            s.with_worker(w.id().clone(), status.state, status.color)
        });
        self.buffers
            .values()
            .fold(snapshot, |s, b| s.with_buffer(b.id().clone(), b.colors()))
    }

    /// Empty every buffer.
    pub fn clear_contents(&self) {
        for buffer in self.buffers.values() {
            buffer.clear();
        }
    }

    /// Force every worker IDLE and drop transient state.
    pub fn reset_workers(&self) {
        for worker in self.workers.values() {
            worker.reset();
        }
    }

    /// Completion check for a run that produced `produced` items.
    ///
    /// Requires every worker quiescent plus either a complete terminal
    /// buffer or empty non-terminal buffers. The verdict is discarded if
    /// any item moved while the check was reading, since the individual
    /// reads are not one atomic observation.
    pub fn drain_check(&self, produced: usize) -> Option<DrainReason> {
        let before = self.activity.load(Ordering::Acquire);
        if !self.workers.values().all(|w| w.is_quiescent()) {
            return None;
        }

        let terminal = self.terminal_id();
        let reason = if terminal
            .and_then(|id| self.buffers.get(id))
            .is_some_and(|b| b.size() == produced)
        {
            Some(DrainReason::TerminalComplete)
        } else if self
            .buffers
            .iter()
            .filter(|(id, _)| Some(*id) != terminal)
            .all(|(_, b)| b.is_empty())
        {
            Some(DrainReason::Drained)
        } else {
            None
        };

        let after = self.activity.load(Ordering::Acquire);
        reason.filter(|_| before == after)
    }
}
