//! Reconnect delays.
//!
//! ```text
//! delay = base + uniform(0, jitter) + min((failures - 1) * step, max_backoff)
//! ```
//!
//! The escalation term is zero for the first failure and grows linearly until
//! it hits the cap, so the worst case is `base + jitter + max_backoff`.

use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use steadyhand_config::ReconnectConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    jitter: Duration,
    step: Duration,
    max_backoff: Duration,
}

impl Backoff {
    pub fn new(base: Duration, jitter: Duration, step: Duration, max_backoff: Duration) -> Self {
        Self {
            base,
            jitter,
            step,
            max_backoff,
        }
    }

    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.jitter_ms),
            Duration::from_millis(config.step_ms),
            Duration::from_millis(config.max_backoff_ms),
        )
    }

    /// The deterministic growth term for the given failure count.
    pub fn escalation(&self, failures: u32) -> Duration {
        let steps = failures.saturating_sub(1);
        self.step.saturating_mul(steps).min(self.max_backoff)
    }

    /// Delay before the next attempt after `failures` consecutive failures.
    pub fn delay<R: Rng + ?Sized>(&self, failures: u32, rng: &mut R) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = Duration::from_millis(rng.random_range(0..=jitter_ms));
        self.base + jitter + self.escalation(failures)
    }

    /// Largest delay [`Backoff::delay`] can return.
    pub fn ceiling(&self) -> Duration {
        self.base + self.jitter + self.max_backoff
    }
}

/// Consecutive failed sessions, kept for the life of the process.
///
/// Incremented on every disconnect or failed connect and reset only once the
/// agent has actually spawned.
#[derive(Debug, Default)]
pub struct ReconnectState {
    failures: AtomicU32,
}

impl ReconnectState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more failure and return the new total.
    pub fn record_failure(&self) -> u32 {
        self.failures.fetch_add(1, Ordering::AcqRel).saturating_add(1)
    }

    pub fn reset(&self) {
        self.failures.store(0, Ordering::Release);
    }

    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::Acquire)
    }
}
