//! Engine-level error type.

use lineworks_core::{ConfigError, TransitionError};

/// Errors returned by [`Orchestrator`](crate::Orchestrator) operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The topology or configuration is invalid. No thread was started.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The operation is not allowed in the current lifecycle phase.
    #[error(transparent)]
    Transition(#[from] TransitionError),
    /// The OS refused to spawn a thread. Anything already started was
    /// torn down again.
    #[error("failed to spawn {role} thread: {source}")]
    Spawn {
        /// Which thread could not be spawned.
        role: &'static str,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
