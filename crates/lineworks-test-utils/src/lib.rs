//! Test utilities and mock sinks for Lineworks development.
//!
//! Provides [`RecordingSink`] and [`FailingSink`] implementations of
//! [`EventSink`], plus fixtures in [`fixtures`] for building layouts,
//! histories, and polling helpers.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use lineworks_core::{EventSink, SinkError, StateView};

#[derive(Default)]
struct Recorded {
    frames: Mutex<Vec<(Instant, StateView)>>,
    ended: AtomicUsize,
    ended_cvar: Condvar,
    ended_lock: Mutex<()>,
}

/// Sink that keeps every frame with its arrival instant.
///
/// Clones share the same storage, so one clone can be boxed into a
/// sink hub while the test inspects another.
#[derive(Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Recorded>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A boxed clone, ready for `SinkHub::subscribe`.
    pub fn boxed(&self) -> Box<dyn EventSink> {
        Box::new(self.clone())
    }

    pub fn frames(&self) -> Vec<StateView> {
        self.lock().iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn arrivals(&self) -> Vec<Instant> {
        self.lock().iter().map(|(t, _)| *t).collect()
    }

    pub fn frame_count(&self) -> usize {
        self.lock().len()
    }

    pub fn last(&self) -> Option<StateView> {
        self.lock().last().map(|(_, v)| v.clone())
    }

    pub fn run_ended_count(&self) -> usize {
        self.inner.ended.load(Ordering::Acquire)
    }

    /// Block until at least one run-ended notification arrived.
    pub fn wait_for_run_end(&self, timeout: Duration) -> bool {
        let guard = self
            .inner
            .ended_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (_guard, result) = self
            .inner
            .ended_cvar
            .wait_timeout_while(guard, timeout, |_| self.run_ended_count() == 0)
            .unwrap_or_else(PoisonError::into_inner);
        !result.timed_out() || self.run_ended_count() > 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Instant, StateView)>> {
        self.inner
            .frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, view: &StateView) -> Result<(), SinkError> {
        self.lock().push((Instant::now(), view.clone()));
        Ok(())
    }

    fn run_ended(&self) -> Result<(), SinkError> {
        let _guard = self
            .inner
            .ended_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.inner.ended.fetch_add(1, Ordering::AcqRel);
        self.inner.ended_cvar.notify_all();
        Ok(())
    }
}

/// Sink that fails every delivery with a fixed error.
pub struct FailingSink {
    pub error: SinkError,
    pub attempts: Arc<AtomicUsize>,
}

impl FailingSink {
    pub fn new(error: SinkError) -> Self {
        Self {
            error,
            attempts: Arc::default(),
        }
    }
}

impl EventSink for FailingSink {
    fn publish(&self, _view: &StateView) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::AcqRel);
        Err(self.error)
    }

    fn run_ended(&self) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::AcqRel);
        Err(self.error)
    }
}
