//! Per-session state shared by every controller.
//!
//! A [`SessionContext`] is built when the agent spawns and dropped when the
//! session ends, so nothing in here outlives a connection. It carries the
//! world and navigator handles, the rest guard, the rest-spot notice
//! cooldown, and the random source all randomized behavior draws from.

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use steadyhand_config::AppConfig;
use steadyhand_core::{Navigator, World, WorldResult};
use steadyhand_workflow::DelayRange;

/// Where the current (or last) rest attempt got to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestPhase {
    #[default]
    Idle,
    Searching,
    Approaching,
    Resting,
}

/// Mutual exclusion for rest attempts.
///
/// At most one attempt runs at a time no matter how many triggers fire. The
/// flag is owned by a [`RestPermit`] and released when the permit drops, so
/// an attempt that fails, returns early, or is cancelled mid-await never
/// leaves it set.
#[derive(Debug, Default)]
pub struct RestGuard {
    in_flight: AtomicBool,
    phase: Mutex<RestPhase>,
}

impl RestGuard {
    /// Claim the guard, or `None` if an attempt is already running.
    pub fn try_acquire(&self) -> Option<RestPermit<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RestPermit { guard: self })
    }

    pub fn is_held(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> RestPhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_phase(&self, phase: RestPhase) {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = phase;
    }
}

/// Proof that the holder owns the [`RestGuard`].
#[derive(Debug)]
pub struct RestPermit<'a> {
    guard: &'a RestGuard,
}

impl RestPermit<'_> {
    pub fn set_phase(&self, phase: RestPhase) {
        self.guard.set_phase(phase);
    }
}

impl Drop for RestPermit<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.store(false, Ordering::Release);
    }
}

/// Lets an event through at most once per window.
#[derive(Debug)]
pub struct Cooldown {
    window: Duration,
    last: Mutex<Option<Instant>>,
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: Mutex::new(None),
        }
    }

    /// `true` if the window has elapsed since the last time this returned
    /// `true` (or it never has). Marks the window as started when it does.
    pub fn try_fire(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        match *last {
            Some(at) if now.duration_since(at) < self.window => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

/// Everything one session's controllers share.
pub struct SessionContext {
    pub world: Arc<dyn World>,
    pub navigator: Arc<dyn Navigator>,
    pub config: Arc<AppConfig>,
    rest_guard: RestGuard,
    rest_notice: Cooldown,
    rng: Mutex<StdRng>,
}

impl SessionContext {
    pub fn new(world: Arc<dyn World>, navigator: Arc<dyn Navigator>, config: Arc<AppConfig>) -> Self {
        let rest_notice = Cooldown::new(Duration::from_millis(config.rest.notice_cooldown_ms));
        Self {
            world,
            navigator,
            config,
            rest_guard: RestGuard::default(),
            rest_notice,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Replace the random source with a seeded one.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn rest_guard(&self) -> &RestGuard {
        &self.rest_guard
    }

    pub fn rest_notice(&self) -> &Cooldown {
        &self.rest_notice
    }

    /// Run `f` with the session's random source. The lock is released before
    /// this returns, so callers draw first and await afterwards.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }

    pub fn sample(&self, range: &DelayRange) -> Duration {
        self.with_rng(|rng| range.sample(rng))
    }
}

/// Log a failed world request at debug level. Returns whether it succeeded.
pub(crate) fn settle(action: &str, result: WorldResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            debug!(action, error = %e, "World request failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_admits_one_holder() {
        let guard = RestGuard::default();
        let permit = guard.try_acquire().unwrap();
        assert!(guard.is_held());
        assert!(guard.try_acquire().is_none());
        drop(permit);
        assert!(!guard.is_held());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn permit_records_phase() {
        let guard = RestGuard::default();
        assert_eq!(guard.phase(), RestPhase::Idle);
        {
            let permit = guard.try_acquire().unwrap();
            permit.set_phase(RestPhase::Approaching);
        }
        assert_eq!(guard.phase(), RestPhase::Approaching);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_fires_once_per_window() {
        let cooldown = Cooldown::new(Duration::from_secs(60));
        assert!(cooldown.try_fire());
        assert!(!cooldown.try_fire());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!cooldown.try_fire());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cooldown.try_fire());
    }
}
