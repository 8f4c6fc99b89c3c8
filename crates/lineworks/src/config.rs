//! Top-level configuration, loadable from TOML.

use std::path::Path;

use lineworks_core::ConfigError;
use lineworks_engine::EngineConfig;
use lineworks_replay::ReplayConfig;
use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// Engine and replay settings.
///
/// Both tables are optional; anything left out takes its default.
///
/// ```toml
/// [engine]
/// seed = 7
/// arrival = { min_ms = 1000, max_ms = 3000 }
/// snapshot_interval_ms = 250
///
/// [replay]
/// pacing = { mode = "fixed", interval_ms = 100 }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Live run settings.
    pub engine: EngineConfig,
    /// Replay settings.
    pub replay: ReplayConfig,
}

impl SimConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ControlError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ControlError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Check every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineworks_core::DelayRange;
    use lineworks_replay::ReplayPacing;

    #[test]
    fn empty_document_gives_defaults() {
        assert_eq!(SimConfig::from_toml_str("").unwrap(), SimConfig::default());
    }

    #[test]
    fn partial_tables_override_only_what_they_name() {
        let config = SimConfig::from_toml_str(
            r#"
            [engine]
            seed = 9
            service = { min_ms = 10, max_ms = 20 }

            [replay]
            pacing = { mode = "fixed", interval_ms = 50 }
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.seed, 9);
        assert_eq!(config.engine.service, DelayRange::new(10, 20));
        assert_eq!(config.engine.grace_ms, 2_000);
        assert_eq!(config.replay.pacing, ReplayPacing::Fixed { interval_ms: 50 });
        assert_eq!(config.replay.trailing_ms, 500);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = SimConfig::from_toml_str(
            r#"
            [engine]
            arrival = { min_ms = 9, max_ms = 1 }
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ControlError::Config(ConfigError::InvalidDelayRange { name: "arrival", .. })
        ));

        assert!(matches!(
            SimConfig::from_toml_str("engine = 3"),
            Err(ControlError::Toml(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            SimConfig::load("/nonexistent/lineworks.toml"),
            Err(ControlError::Io(_))
        ));
    }
}
