//! Error types for the replay system.

use lineworks_core::TransitionError;

/// Errors returned by [`Replayer`](crate::Replayer) operations.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// There is nothing recorded to replay.
    #[error("history is empty")]
    EmptyHistory,
    /// The replay cannot start or stop in the current mode.
    #[error(transparent)]
    Transition(#[from] TransitionError),
    /// The OS refused to spawn the replay thread.
    #[error("failed to spawn replay thread: {0}")]
    Spawn(#[source] std::io::Error),
}
