//! Run pacing and monitor configuration.

use std::time::Duration;

use lineworks_core::{ConfigError, DelayRange};
use serde::{Deserialize, Serialize};

/// Timing and seeding for a live run.
///
/// Every field has a default, so a TOML table may name only what it
/// changes:
///
/// ```
/// use lineworks_engine::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.poll_ms, 500);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for the generator stream and the per-worker streams.
    pub seed: u64,
    /// Delay between two generated items. Default: 1000..3000 ms.
    pub arrival: DelayRange,
    /// Worker service time per item. Default: 500..2000 ms.
    pub service: DelayRange,
    /// Delay before the generator emits its first item. Default: 0.
    pub start_delay_ms: u64,
    /// Wait between generator completion and the first drain check.
    /// Default: 2000.
    pub grace_ms: u64,
    /// Interval between drain checks. Default: 500.
    pub poll_ms: u64,
    /// Periodic snapshot interval while running. `None` records on
    /// state changes only.
    pub snapshot_interval_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            arrival: DelayRange::new(1_000, 3_000),
            service: DelayRange::new(500, 2_000),
            start_delay_ms: 0,
            grace_ms: 2_000,
            poll_ms: 500,
            snapshot_interval_ms: None,
        }
    }
}

impl EngineConfig {
    /// Check ranges and intervals.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.arrival.validate("arrival")?;
        self.service.validate("service")?;
        if self.poll_ms == 0 {
            return Err(ConfigError::InvalidSetting {
                reason: "poll_ms must be greater than zero".into(),
            });
        }
        if self.snapshot_interval_ms == Some(0) {
            return Err(ConfigError::InvalidSetting {
                reason: "snapshot_interval_ms must be greater than zero when set".into(),
            });
        }
        Ok(())
    }

    pub(crate) fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub(crate) fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub(crate) fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub(crate) fn snapshot_interval(&self) -> Option<Duration> {
        self.snapshot_interval_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_pacing() {
        let c = EngineConfig::default();
        assert_eq!(c.arrival, DelayRange::new(1_000, 3_000));
        assert_eq!(c.service, DelayRange::new(500, 2_000));
        assert_eq!(c.grace(), Duration::from_secs(2));
        assert_eq!(c.snapshot_interval(), None);
    }

    #[test]
    fn zero_poll_is_rejected() {
        let c = EngineConfig {
            poll_ms: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            c.validate(),
            Err(ConfigError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn inverted_service_range_is_rejected() {
        let c = EngineConfig {
            service: DelayRange::new(10, 1),
            ..EngineConfig::default()
        };
        assert_eq!(
            c.validate(),
            Err(ConfigError::InvalidDelayRange {
                name: "service",
                min_ms: 10,
                max_ms: 1,
            })
        );
    }
}
