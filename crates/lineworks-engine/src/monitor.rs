//! Completion monitor.
//!
//! Waits for the generator thread, allows a grace period for items in
//! flight, then polls the topology's drain check. Every wait is cut
//! short by the run stop token.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use lineworks_core::StopToken;

use crate::generator::Generator;
use crate::topology::{DrainReason, Topology};

/// Shared slot for the generator's join handle. Whoever takes it joins.
pub(crate) type GeneratorSlot = Arc<Mutex<Option<JoinHandle<usize>>>>;

pub(crate) struct Watch {
    pub generator_thread: GeneratorSlot,
    pub generator: Arc<Generator>,
    pub topology: Arc<Topology>,
    pub stop: StopToken,
    pub grace: Duration,
    pub poll: Duration,
}

/// Returns the completion reason, or `None` if the run was stopped
/// first.
pub(crate) fn watch(w: Watch) -> Option<DrainReason> {
    let handle = w
        .generator_thread
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(handle) = handle {
        if handle.join().is_err() {
            tracing::warn!("generator thread panicked");
        }
    }
    if w.stop.is_stopped() || !w.stop.sleep(w.grace) {
        return None;
    }

    let produced = w.generator.produced();
    let mut polls = 0u32;
    loop {
        if let Some(reason) = w.topology.drain_check(produced) {
            tracing::debug!(?reason, produced, polls, "run drained");
            return Some(reason);
        }
        polls += 1;
        if !w.stop.sleep(w.poll) {
            return None;
        }
    }
}
