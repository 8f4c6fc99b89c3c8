//! Worker thread body: the IDLE/BUSY state machine.
//!
//! A worker scans its inputs in order, takes the first available item,
//! holds it for a sampled service time, then puts a copy into every
//! output. With nothing to take it registers its [`WakeSignal`] with all
//! inputs and blocks until a put hands it a wake-up or the run stops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lineworks_core::{BufferId, Color, DelayRange, Item, StopToken, WorkerId, WorkerState};
use rand::Rng;
use smallvec::SmallVec;

use crate::buffer::Buffer;
use crate::notify::{ChangeEvent, ChangeNotifier};
use crate::wake::WakeSignal;

type Ports = SmallVec<[Arc<Buffer>; 4]>;

/// Externally visible worker status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStatus {
    /// IDLE or BUSY.
    pub state: WorkerState,
    /// Colour of the held item; neutral when idle.
    pub color: Color,
}

impl WorkerStatus {
    /// The idle status.
    pub const IDLE: Self = Self {
        state: WorkerState::Idle,
        color: Color::Neutral,
    };

    /// Busy holding an item of `color`.
    pub fn busy(color: Color) -> Self {
        Self {
            state: WorkerState::Busy,
            color,
        }
    }
}

/// Status plus the claiming flag, read together by the drain check.
#[derive(Default)]
struct Activity {
    status: WorkerStatus,
    /// Set while scanning inputs or holding a freshly taken item that is
    /// not yet reported BUSY.
    claiming: bool,
}

/// Summary returned by a worker thread when its loop exits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerReport {
    /// Worker id.
    pub id: WorkerId,
    /// Items fully served and forwarded.
    pub processed: u64,
    /// Whether an item was dropped because the run stopped mid-service.
    pub abandoned: bool,
}

/// A processing station.
pub struct Worker {
    id: WorkerId,
    inputs: Mutex<Ports>,
    outputs: Mutex<Ports>,
    activity: Mutex<Activity>,
    running: AtomicBool,
    signal: Arc<WakeSignal>,
    notifier: ChangeNotifier,
}

// Compile-time assertion: Worker must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Worker>();
};

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Runs when the loop exits, panics included: leaves every input's
/// waiter list, drops a latched wake-up, and forces IDLE.
struct IdleOnExit<'a> {
    worker: &'a Worker,
    inputs: &'a Ports,
}

impl Drop for IdleOnExit<'_> {
    fn drop(&mut self) {
        for input in self.inputs {
            input.detach(&self.worker.id);
        }
        self.worker.signal.reset();
        self.worker.update(|a| {
            a.claiming = false;
            a.status = WorkerStatus::IDLE;
        });
    }
}

impl Worker {
    #[cfg(test)]
    fn new(id: WorkerId) -> Self {
        Self::wired(id, ChangeNotifier::disabled())
    }

    pub(crate) fn wired(id: WorkerId, notifier: ChangeNotifier) -> Self {
        Self {
            signal: Arc::new(WakeSignal::new(id.clone())),
            id,
            inputs: Mutex::new(Ports::new()),
            outputs: Mutex::new(Ports::new()),
            activity: Mutex::new(Activity::default()),
            running: AtomicBool::new(false),
            notifier,
        }
    }

    /// Worker id.
    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    /// Append an input port.
    pub(crate) fn connect_input(&self, buffer: Arc<Buffer>) {
        lock(&self.inputs).push(buffer);
    }

    /// Append an output port.
    pub(crate) fn connect_output(&self, buffer: Arc<Buffer>) {
        lock(&self.outputs).push(buffer);
    }

    /// Input buffer ids in scan order.
    pub fn input_ids(&self) -> Vec<BufferId> {
        lock(&self.inputs).iter().map(|b| b.id().clone()).collect()
    }

    /// Output buffer ids in put order.
    pub fn output_ids(&self) -> Vec<BufferId> {
        lock(&self.outputs).iter().map(|b| b.id().clone()).collect()
    }

    /// Current state and colour.
    pub fn status(&self) -> WorkerStatus {
        self.activity().status
    }

    /// Whether the worker neither holds an item, nor is about to take
    /// one, nor has a wake-up pending.
    pub fn is_quiescent(&self) -> bool {
        let (idle, claiming) = {
            let a = self.activity();
            (a.status.state == WorkerState::Idle, a.claiming)
        };
        idle && !claiming && !self.signal.is_notified()
    }

    /// Whether the run loop is allowed to continue.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Allow the run loop to start. Called before spawning the thread.
    pub(crate) fn arm(&self) {
        self.signal.reset();
        self.running.store(true, Ordering::Release);
    }

    /// Clear the running flag and release a blocked wait.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
        self.signal.notify();
    }

    /// Force IDLE/neutral and drop transient state. Only valid while no
    /// thread is running this worker.
    pub fn reset(&self) {
        self.running.store(false, Ordering::Release);
        self.signal.reset();
        self.update(|a| {
            a.claiming = false;
            a.status = WorkerStatus::IDLE;
        });
    }

    /// Run the state machine until stopped. Blocks the calling thread.
    ///
    /// The port lists are read once at entry; topology edits during a
    /// run are not observed.
    pub fn run<R: Rng + ?Sized>(
        &self,
        service: DelayRange,
        rng: &mut R,
        stop: &StopToken,
    ) -> WorkerReport {
        let inputs = lock(&self.inputs).clone();
        let outputs = lock(&self.outputs).clone();
        let _idle = IdleOnExit {
            worker: self,
            inputs: &inputs,
        };
        let mut report = WorkerReport {
            id: self.id.clone(),
            processed: 0,
            abandoned: false,
        };
        tracing::debug!(
            worker = %self.id,
            inputs = inputs.len(),
            outputs = outputs.len(),
            "worker started"
        );

        while self.is_running() {
            // IDLE and claiming in one step, so the worker never looks
            // quiescent while its inputs may still hold items.
            self.update(|a| {
                a.status = WorkerStatus::IDLE;
                a.claiming = true;
            });

            let Some(item) = self.acquire(&inputs) else {
                break;
            };

            let color = item.color();
            self.update(|a| {
                a.status = WorkerStatus::busy(color);
                a.claiming = false;
            });
            tracing::debug!(worker = %self.id, item = %item.id(), %color, "busy");

            if !stop.sleep(service.sample(rng)) {
                tracing::debug!(
                    worker = %self.id,
                    item = %item.id(),
                    "stopped mid-service, item abandoned"
                );
                report.abandoned = true;
                break;
            }

            for output in &outputs {
                output.put(item.clone());
            }
            report.processed += 1;
        }

        tracing::debug!(worker = %self.id, processed = report.processed, "worker exited");
        report
    }

    /// Take the first available input item, waiting when all are empty.
    /// `None` once the worker is stopped.
    fn acquire(&self, inputs: &Ports) -> Option<Item> {
        loop {
            if !self.is_running() {
                return None;
            }
            if let Some(item) = inputs.iter().find_map(|b| b.take()) {
                return Some(item);
            }

            self.signal.reset();
            let mut ready = false;
            for input in inputs {
                ready |= input.attach(&self.signal);
            }

            if !ready {
                self.update(|a| a.claiming = false);
                self.signal.wait(&self.running);
                self.update(|a| a.claiming = true);
            }

            for input in inputs {
                input.detach(&self.id);
            }
        }
    }

    fn activity(&self) -> MutexGuard<'_, Activity> {
        self.activity.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate activity; emit a change notification if the status moved.
    fn update(&self, f: impl FnOnce(&mut Activity)) {
        let changed = {
            let mut a = self.activity();
            let before = a.status;
            f(&mut a);
            a.status != before
        };
        if changed {
            self.notifier.notify(ChangeEvent::Worker(self.id.clone()));
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
