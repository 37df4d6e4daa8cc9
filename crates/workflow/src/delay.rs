//! Uniformly distributed delays.

use rand::Rng;
use std::time::Duration;

use steadyhand_config::RangeConfig;

/// An inclusive delay range with millisecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    /// `None` when `min > max`.
    pub fn new(min: Duration, max: Duration) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    /// A range that always yields the same delay.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }

    /// From a config range expressed in milliseconds. Inverted ranges are
    /// rejected by config validation before this is reached; they collapse to
    /// `min` here.
    pub fn from_millis(range: &RangeConfig<u64>) -> Self {
        let (min, max) = range.as_millis();
        Self::new(min, max).unwrap_or_else(|| Self::fixed(min))
    }

    /// From a config range expressed in seconds.
    pub fn from_secs(range: &RangeConfig<u64>) -> Self {
        let (min, max) = range.as_secs();
        Self::new(min, max).unwrap_or_else(|| Self::fixed(min))
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw a delay uniformly from `[min, max]`, both ends included.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rng.random_range(min..=max))
    }
}
