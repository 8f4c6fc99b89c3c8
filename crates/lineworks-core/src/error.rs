//! Error types shared across the Lineworks workspace.
//!
//! Configuration problems are raised synchronously by the call that
//! caused them; lifecycle violations are rejected no-ops; sink failures
//! never leave the sink hub.

use thiserror::Error;

use crate::id::{BufferId, WorkerId};
use crate::layout::Direction;
use crate::state::SimulationMode;

/// A topology or settings problem detected before any thread starts.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A buffer with this id already exists.
    #[error("buffer '{id}' already exists")]
    DuplicateBuffer {
        /// The clashing id.
        id: BufferId,
    },
    /// A worker with this id already exists.
    #[error("worker '{id}' already exists")]
    DuplicateWorker {
        /// The clashing id.
        id: WorkerId,
    },
    /// No buffer has this id.
    #[error("buffer '{id}' not found")]
    UnknownBuffer {
        /// The missing id.
        id: BufferId,
    },
    /// No worker has this id.
    #[error("worker '{id}' not found")]
    UnknownWorker {
        /// The missing id.
        id: WorkerId,
    },
    /// The worker is already connected to the buffer in this direction.
    #[error("worker '{worker}' already has {direction} connection to buffer '{buffer}'")]
    DuplicateConnection {
        /// Worker side of the connection.
        worker: WorkerId,
        /// Buffer side of the connection.
        buffer: BufferId,
        /// Connection direction.
        direction: Direction,
    },
    /// The worker has no input buffer.
    #[error("worker '{worker}' has no input buffers")]
    MissingInput {
        /// The unconnected worker.
        worker: WorkerId,
    },
    /// The worker has no output buffer.
    #[error("worker '{worker}' has no output buffers")]
    MissingOutput {
        /// The unconnected worker.
        worker: WorkerId,
    },
    /// The topology has no buffers at all.
    #[error("no buffers configured")]
    NoBuffers,
    /// Following outputs to inputs from this worker leads back to it.
    #[error("worker '{worker}' feeds back into its own inputs")]
    Cycle {
        /// A worker on the cycle.
        worker: WorkerId,
    },
    /// A delay range whose lower bound exceeds its upper bound.
    #[error("invalid delay range for {name}: min {min_ms}ms > max {max_ms}ms")]
    InvalidDelayRange {
        /// Which setting the range belongs to.
        name: &'static str,
        /// Configured lower bound.
        min_ms: u64,
        /// Configured upper bound.
        max_ms: u64,
    },
    /// Any other rejected setting.
    #[error("invalid setting: {reason}")]
    InvalidSetting {
        /// Description of the violated constraint.
        reason: String,
    },
}

/// A lifecycle call made in a state that does not permit it.
///
/// Rejections never change any state.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// `start` while a run is already active.
    #[error("a run is already active")]
    AlreadyRunning,
    /// `stop` with no active run.
    #[error("no run is active")]
    NotRunning,
    /// Topology edits while a run is active or stopping.
    #[error("topology cannot change while a run is active")]
    RunActive,
    /// `replay` while a live run holds the line.
    #[error("cannot replay while a live run is active")]
    LiveRunActive,
    /// `replay` while another replay is in progress.
    #[error("a replay is already in progress")]
    ReplayActive,
    /// `stop_replay` with no replay in progress.
    #[error("no replay is in progress")]
    NotReplaying,
    /// The shared mode was not the one the transition requires.
    #[error("expected mode {expected}, found {found}")]
    ModeMismatch {
        /// Mode the transition starts from.
        expected: SimulationMode,
        /// Mode actually observed.
        found: SimulationMode,
    },
}

/// Delivery failure of one event sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The receiving side has gone away.
    #[error("subscriber disconnected")]
    Disconnected,
    /// The subscriber is not keeping up.
    #[error("subscriber queue full")]
    Full,
}
