//! Replay pacing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How replayed entries are spaced in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReplayPacing {
    /// Reproduce the recorded gaps between entries.
    #[default]
    Recorded,
    /// Emit one entry every `interval_ms`, ignoring recorded gaps.
    Fixed {
        /// Spacing between emissions.
        interval_ms: u64,
    },
}

impl ReplayPacing {
    /// Offset of entry `index`, recorded at `offset` after the first
    /// entry, from the start of the replay.
    pub fn due(&self, index: usize, offset: Duration) -> Duration {
        match *self {
            Self::Recorded => offset,
            Self::Fixed { interval_ms } => {
                Duration::from_millis(interval_ms.saturating_mul(index as u64))
            }
        }
    }
}

/// Replay settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Entry spacing. Default: recorded.
    pub pacing: ReplayPacing,
    /// Pause after the last entry before the mode returns to STOPPED.
    /// Default: 500.
    pub trailing_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            pacing: ReplayPacing::Recorded,
            trailing_ms: 500,
        }
    }
}

impl ReplayConfig {
    pub(crate) fn trailing(&self) -> Duration {
        Duration::from_millis(self.trailing_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_pacing_uses_the_offset() {
        let p = ReplayPacing::Recorded;
        assert_eq!(p.due(3, Duration::from_millis(350)), Duration::from_millis(350));
    }

    #[test]
    fn fixed_pacing_uses_the_index() {
        let p = ReplayPacing::Fixed { interval_ms: 40 };
        assert_eq!(p.due(0, Duration::from_secs(9)), Duration::ZERO);
        assert_eq!(p.due(3, Duration::from_secs(9)), Duration::from_millis(120));
    }

    #[test]
    fn parses_from_toml() {
        let c: ReplayConfig = toml::from_str(
            r#"
            trailing_ms = 0
            pacing = { mode = "fixed", interval_ms = 25 }
            "#,
        )
        .unwrap();
        assert_eq!(c.pacing, ReplayPacing::Fixed { interval_ms: 25 });
        assert_eq!(c.trailing_ms, 0);

        let d: ReplayConfig = toml::from_str("").unwrap();
        assert_eq!(d, ReplayConfig::default());
    }
}
