//! Replay thread and its control handle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use lineworks_core::{
    History, Layout, ModeCell, SimulationMode, SinkHub, Snapshot, StateView, StopHandle,
    StopToken, TransitionError,
};

use crate::config::ReplayConfig;
use crate::error::ReplayError;

/// How a replay session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// Every entry was emitted and the trailing delay elapsed.
    Completed,
    /// `stop_replay()` cut the session short.
    Interrupted,
}

struct Session {
    stop: StopHandle,
    handle: JoinHandle<ReplayOutcome>,
}

type Cursor = Arc<Mutex<Option<Arc<Snapshot>>>>;

/// Drives replay sessions over recorded histories.
///
/// Shares the sink hub and the mode cell with the live engine, so a
/// replay and a live run exclude each other.
pub struct Replayer {
    config: ReplayConfig,
    sinks: Arc<SinkHub>,
    mode: Arc<ModeCell>,
    session: Mutex<Option<Session>>,
    cursor: Cursor,
}

// Compile-time assertion: Replayer must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Replayer>();
};

impl std::fmt::Debug for Replayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replayer")
            .field("config", &self.config)
            .field("mode", &self.mode.get())
            .finish()
    }
}

impl Replayer {
    /// A replayer publishing to `sinks` and coordinating through `mode`.
    pub fn new(config: ReplayConfig, sinks: Arc<SinkHub>, mode: Arc<ModeCell>) -> Self {
        Self {
            config,
            sinks,
            mode,
            session: Mutex::new(None),
            cursor: Arc::default(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Whether a session is emitting or in its trailing delay.
    pub fn is_replaying(&self) -> bool {
        self.mode.get() == SimulationMode::Replay
    }

    /// The entry most recently emitted by the current or last session.
    pub fn cursor(&self) -> Option<Arc<Snapshot>> {
        lock(&self.cursor).clone()
    }

    /// Start replaying a copy of `history`, projected onto `layout`.
    ///
    /// Refused while a live run is active, when the history is empty,
    /// or while another replay is in progress.
    pub fn replay(&self, history: &History, layout: Layout) -> Result<(), ReplayError> {
        let mut session = self.session();
        if self.mode.get() == SimulationMode::Live {
            return Err(TransitionError::LiveRunActive.into());
        }
        let entries = history.entries();
        if entries.is_empty() {
            return Err(ReplayError::EmptyHistory);
        }
        self.mode
            .transition(SimulationMode::Stopped, SimulationMode::Replay)
            .map_err(|e| match e {
                TransitionError::ModeMismatch {
                    found: SimulationMode::Live,
                    ..
                } => TransitionError::LiveRunActive,
                _ => TransitionError::ReplayActive,
            })?;

        // A previous session that ended on its own still holds a handle.
        if let Some(finished) = session.take() {
            let _ = finished.handle.join();
        }
        *lock(&self.cursor) = None;

        let stop = StopHandle::new();
        let playback = Playback {
            entries,
            layout,
            config: self.config.clone(),
            sinks: Arc::clone(&self.sinks),
            mode: Arc::clone(&self.mode),
            cursor: Arc::clone(&self.cursor),
            stop: stop.token(),
        };
        let count = playback.entries.len();
        let handle = thread::Builder::new()
            .name("lineworks-replay".into())
            .spawn(move || playback.run())
            .map_err(|e| {
                self.mode.force(SimulationMode::Stopped);
                ReplayError::Spawn(e)
            })?;

        tracing::info!(entries = count, pacing = ?self.config.pacing, "replay started");
        *session = Some(Session { stop, handle });
        Ok(())
    }

    /// Interrupt the current replay, wait for its thread, and return to
    /// STOPPED.
    ///
    /// A session that reaches its natural end while being stopped
    /// reports [`ReplayOutcome::Completed`].
    pub fn stop_replay(&self) -> Result<ReplayOutcome, ReplayError> {
        let mut session = {
            let mut slot = self.session();
            if !self.is_replaying() {
                // A session that already ended on its own is only reaped.
                if let Some(finished) = slot.take() {
                    let _ = finished.handle.join();
                }
                return Err(TransitionError::NotReplaying.into());
            }
            match slot.take() {
                Some(session) => session,
                None => return Err(TransitionError::NotReplaying.into()),
            }
        };
        session.stop.trigger();
        let outcome = session.handle.join().unwrap_or_else(|_| {
            tracing::warn!("replay thread panicked");
            ReplayOutcome::Interrupted
        });

        // Whoever moves REPLAY → STOPPED sends the single run-ended notice.
        if self
            .mode
            .transition(SimulationMode::Replay, SimulationMode::Stopped)
            .is_ok()
        {
            self.sinks.notify_run_ended();
        }
        tracing::info!(?outcome, "replay stopped");
        Ok(outcome)
    }

    fn session(&self) -> MutexGuard<'_, Option<Session>> {
        lock(&self.session)
    }
}

impl Drop for Replayer {
    fn drop(&mut self) {
        if self.is_replaying() {
            let _ = self.stop_replay();
        }
    }
}

/// Everything the replay thread owns.
struct Playback {
    entries: Vec<Arc<Snapshot>>,
    layout: Layout,
    config: ReplayConfig,
    sinks: Arc<SinkHub>,
    mode: Arc<ModeCell>,
    cursor: Cursor,
    stop: StopToken,
}

impl Playback {
    fn run(self) -> ReplayOutcome {
        let start = Instant::now();
        let Some(origin) = self.entries.first().map(|s| s.timestamp()) else {
            return ReplayOutcome::Completed;
        };

        for (index, snapshot) in self.entries.iter().enumerate() {
            let offset = snapshot.timestamp().saturating_sub(origin);
            let due = self.config.pacing.due(index, offset);
            if !self.stop.sleep(due.saturating_sub(start.elapsed())) {
                tracing::debug!(index, "replay interrupted");
                return ReplayOutcome::Interrupted;
            }
            *lock(&self.cursor) = Some(Arc::clone(snapshot));
            self.sinks.publish(&StateView::project(
                snapshot,
                &self.layout,
                SimulationMode::Replay,
            ));
        }

        if !self.stop.sleep(self.config.trailing()) {
            return ReplayOutcome::Interrupted;
        }
        if self
            .mode
            .transition(SimulationMode::Replay, SimulationMode::Stopped)
            .is_ok()
        {
            self.sinks.notify_run_ended();
            tracing::info!(entries = self.entries.len(), "replay completed");
        }
        ReplayOutcome::Completed
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineworks_test_utils::RecordingSink;

    #[test]
    fn session_ending_during_stop_reports_completed() {
        let sinks = Arc::new(SinkHub::new());
        let sink = RecordingSink::new();
        sinks.subscribe(sink.boxed());
        let mode = Arc::new(ModeCell::new());
        let replayer = Replayer::new(ReplayConfig::default(), sinks, Arc::clone(&mode));

        // A session that finishes by itself as soon as the stop arrives,
        // taking the REPLAY → STOPPED transition first.
        mode.force(SimulationMode::Replay);
        let stop = StopHandle::new();
        let token = stop.token();
        let session_mode = Arc::clone(&mode);
        let handle = thread::spawn(move || {
            let _ = token.receiver().recv();
            let _ = session_mode.transition(SimulationMode::Replay, SimulationMode::Stopped);
            ReplayOutcome::Completed
        });
        *replayer.session() = Some(Session { stop, handle });

        assert_eq!(replayer.stop_replay().unwrap(), ReplayOutcome::Completed);
        assert_eq!(mode.get(), SimulationMode::Stopped);
        assert_eq!(sink.run_ended_count(), 0);
        assert!(matches!(
            replayer.stop_replay(),
            Err(ReplayError::Transition(TransitionError::NotReplaying))
        ));
    }
}
