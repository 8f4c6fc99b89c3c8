//! Randomised delays drawn from a caller-supplied RNG.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A half-open millisecond range `[min_ms, max_ms)` to sample delays from.
///
/// Equal bounds give a fixed delay. Sampling takes the RNG as an
/// argument so that callers control seeding.
///
/// # Examples
///
/// ```
/// use lineworks_core::DelayRange;
/// use std::time::Duration;
///
/// let fixed = DelayRange::fixed(25);
/// assert_eq!(fixed.min(), Duration::from_millis(25));
/// assert!(DelayRange::new(10, 5).validate("service").is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    /// Inclusive lower bound in milliseconds.
    pub min_ms: u64,
    /// Exclusive upper bound in milliseconds.
    pub max_ms: u64,
}

impl DelayRange {
    /// A range from `min_ms` (inclusive) to `max_ms` (exclusive).
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// A range that always yields `ms`.
    pub const fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    /// Lower bound.
    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    /// Upper bound.
    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    /// Reject ranges with `min_ms > max_ms`. `name` labels the error.
    pub fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if self.min_ms > self.max_ms {
            return Err(ConfigError::InvalidDelayRange {
                name,
                min_ms: self.min_ms,
                max_ms: self.max_ms,
            });
        }
        Ok(())
    }

    /// Draw one delay.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min_ms >= self.max_ms {
            return self.min();
        }
        rng.gen_range(self.min()..self.max())
    }
}
