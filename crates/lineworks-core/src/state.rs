//! Worker states, the simulation mode, and the shared mode cell.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::error::TransitionError;

/// Activity state of a worker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerState {
    /// No item held; scanning inputs or blocked waiting for one.
    #[default]
    Idle,
    /// Holding an item and processing it.
    Busy,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("IDLE"),
            Self::Busy => f.write_str("BUSY"),
        }
    }
}

/// What the simulation as a whole is doing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimulationMode {
    /// Nothing running; topology may be edited.
    #[default]
    Stopped,
    /// A live run is in progress.
    Live,
    /// Recorded history is being replayed.
    Replay,
}

impl fmt::Display for SimulationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => f.write_str("STOPPED"),
            Self::Live => f.write_str("LIVE"),
            Self::Replay => f.write_str("REPLAY"),
        }
    }
}

/// Shared, mutex-guarded [`SimulationMode`].
///
/// The orchestrator and the replayer both hold an `Arc<ModeCell>`; every
/// transition between them goes through [`transition`](Self::transition),
/// so a live run and a replay can never both claim the line.
#[derive(Debug, Default)]
pub struct ModeCell {
    mode: Mutex<SimulationMode>,
}

impl ModeCell {
    /// Create a cell in [`SimulationMode::Stopped`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode.
    pub fn get(&self) -> SimulationMode {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move from `from` to `to`, or report the mode actually found.
    pub fn transition(
        &self,
        from: SimulationMode,
        to: SimulationMode,
    ) -> Result<(), TransitionError> {
        let mut mode = self.mode.lock().unwrap_or_else(PoisonError::into_inner);
        if *mode != from {
            return Err(TransitionError::ModeMismatch {
                expected: from,
                found: *mode,
            });
        }
        *mode = to;
        Ok(())
    }

    /// Unconditionally overwrite the mode. Returns the previous mode.
    pub fn force(&self, to: SimulationMode) -> SimulationMode {
        let mut mode = self.mode.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *mode, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_requires_expected_mode() {
        let cell = ModeCell::new();
        assert_eq!(cell.get(), SimulationMode::Stopped);

        cell.transition(SimulationMode::Stopped, SimulationMode::Live)
            .unwrap();
        assert_eq!(cell.get(), SimulationMode::Live);

        let err = cell
            .transition(SimulationMode::Stopped, SimulationMode::Replay)
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::ModeMismatch {
                expected: SimulationMode::Stopped,
                found: SimulationMode::Live,
            }
        );
        assert_eq!(cell.get(), SimulationMode::Live);
    }

    #[test]
    fn force_returns_previous_mode() {
        let cell = ModeCell::new();
        assert_eq!(cell.force(SimulationMode::Replay), SimulationMode::Stopped);
        assert_eq!(cell.force(SimulationMode::Stopped), SimulationMode::Replay);
    }

    #[test]
    fn states_render_in_upper_case() {
        assert_eq!(WorkerState::Busy.to_string(), "BUSY");
        assert_eq!(SimulationMode::Live.to_string(), "LIVE");
    }
}
