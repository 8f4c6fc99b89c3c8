//! Errors surfaced by the control surface.

use lineworks_core::ConfigError;
use lineworks_engine::EngineError;
use lineworks_replay::ReplayError;

/// Any failure of a [`Simulation`](crate::Simulation) operation.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// Invalid settings or topology.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Live engine refusal or failure.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// Replay refusal or failure.
    #[error(transparent)]
    Replay(#[from] ReplayError),
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration is not valid TOML for [`SimConfig`](crate::SimConfig).
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
    /// The blueprint is not valid JSON for [`Blueprint`](crate::Blueprint).
    #[error("invalid blueprint: {0}")]
    Json(#[from] serde_json::Error),
}
