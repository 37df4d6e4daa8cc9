//! Behavior arbitration and session resilience.
//!
//! Two layers:
//!
//! 1. **Per session**: a [`SessionContext`] and the tasks that run against it.
//!    The decision loop ([`BehaviorLoop`]) evaluates combat, rest, and idle in
//!    that order; the rest enforcer, humanizer, chat and hunger tasks tick on
//!    their own cadences alongside it.
//! 2. **Per process**: the [`SessionManager`] connects, starts and cancels the
//!    session tasks, and reconnects with [`Backoff`] when a session ends.

pub mod backoff;
pub mod behavior;
pub mod chat;
pub mod combat;
pub mod context;
pub mod humanizer;
pub mod hunger;
pub mod idle;
pub mod rest;
pub mod session;
pub mod tasks;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use backoff::{Backoff, ReconnectState};
pub use behavior::{BehaviorLoop, Cycle};
pub use chat::ChatScheduler;
pub use combat::{CombatController, CombatOutcome};
pub use context::{Cooldown, RestGuard, RestPermit, RestPhase, SessionContext};
pub use humanizer::{Gesture, HumanizerController, HumanizerOutcome};
pub use hunger::{HungerMaintainer, HungerOutcome};
pub use idle::{IdleAction, IdleController, IdleOutcome};
pub use rest::{RestController, RestOutcome, RestSkip};
pub use session::{SessionEnd, SessionManager, SessionState, SessionStatus};
pub use tasks::{Controllers, spawn_session_tasks};
