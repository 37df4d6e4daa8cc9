//! Resting through the night.
//!
//! Two independent triggers call [`RestController::attempt`]: the session's
//! nightfall notification and the fixed-interval rest enforcer. The attempt
//! is multi-step and awaits the world in between, so entry goes through the
//! session's [`RestGuard`](crate::context::RestGuard).

use std::time::Duration;
use tracing::{debug, info};

use steadyhand_config::RestConfig;
use steadyhand_core::{AgentState, Goal, Vec3, WorldError};

use crate::context::{RestPhase, SessionContext, settle};

/// Why an attempt returned without doing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestSkip {
    Disabled,
    NotSpawned,
    AlreadyResting,
    /// Neither night nor (when allowed) rain.
    NotEligible,
}

/// Which exit an attempt took.
#[derive(Debug, Clone, PartialEq)]
pub enum RestOutcome {
    /// Another attempt holds the guard.
    Busy,
    Skipped(RestSkip),
    NoRestSpot { notice_logged: bool },
    /// Heading for the spot; a later trigger re-checks.
    Approaching { spot: Vec3, distance: f64 },
    Resting { spot: Vec3 },
    Refused { spot: Vec3, error: WorldError },
}

pub struct RestController {
    config: RestConfig,
}

impl RestController {
    pub fn new(config: RestConfig) -> Self {
        Self { config }
    }

    /// How often the rest enforcer retries.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.config.retry_interval_ms)
    }

    /// Night, or rain when resting in rain is allowed.
    pub fn is_eligible(&self, state: &AgentState) -> bool {
        state.environment.is_night || (self.config.rest_in_rain && state.environment.is_raining)
    }

    pub async fn attempt(&self, ctx: &SessionContext) -> RestOutcome {
        let Some(permit) = ctx.rest_guard().try_acquire() else {
            debug!("Rest attempt already in flight");
            return RestOutcome::Busy;
        };

        let state = match self.check_preconditions(ctx) {
            Ok(state) => state,
            Err(skip) => {
                if skip != RestSkip::AlreadyResting {
                    permit.set_phase(RestPhase::Idle);
                }
                return RestOutcome::Skipped(skip);
            }
        };

        permit.set_phase(RestPhase::Searching);
        let Some(spot) = ctx.world.find_rest_spot(self.config.search_radius) else {
            permit.set_phase(RestPhase::Idle);
            let notice_logged = ctx.rest_notice().try_fire();
            if notice_logged {
                info!(
                    radius = self.config.search_radius,
                    "No rest spot nearby"
                );
            }
            return RestOutcome::NoRestSpot { notice_logged };
        };

        if !ctx.navigator.is_moving() {
            ctx.navigator
                .set_goal(Goal::near(spot, self.config.approach_distance));
        }

        let position = ctx.world.state().map_or(state.position, |s| s.position);
        let distance = position.distance_to(spot);
        if distance > self.config.approach_distance + self.config.approach_slack {
            permit.set_phase(RestPhase::Approaching);
            debug!(%spot, distance, "Approaching rest spot");
            return RestOutcome::Approaching { spot, distance };
        }

        settle("deactivate_item", ctx.world.deactivate_item().await);
        match ctx.world.sleep_in(spot).await {
            Ok(()) => {
                permit.set_phase(RestPhase::Resting);
                info!(%spot, "Resting");
                RestOutcome::Resting { spot }
            }
            Err(error) => {
                permit.set_phase(RestPhase::Idle);
                info!(%spot, %error, "Could not rest");
                RestOutcome::Refused { spot, error }
            }
        }
    }

    fn check_preconditions(&self, ctx: &SessionContext) -> Result<AgentState, RestSkip> {
        if !self.config.enabled {
            return Err(RestSkip::Disabled);
        }
        let state = ctx.world.state().ok_or(RestSkip::NotSpawned)?;
        if state.is_sleeping {
            return Err(RestSkip::AlreadyResting);
        }
        if !self.is_eligible(&state) {
            return Err(RestSkip::NotEligible);
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use steadyhand_config::AppConfig;
    use steadyhand_core::{Item, World};
    use steadyhand_sim::{SimWorld, WorldAction};
    use tokio::sync::Notify;

    use crate::test_helpers::context;

    fn setup(world: &Arc<SimWorld>) -> (Arc<SessionContext>, RestController) {
        let config = AppConfig::default();
        let rest = RestController::new(config.rest.clone());
        (Arc::new(context(world, config)), rest)
    }

    #[tokio::test]
    async fn daytime_attempt_is_skipped() {
        let world = Arc::new(SimWorld::spawned_at("bot", Vec3::ZERO));
        world.add_rest_spot(Vec3::new(1.0, 0.0, 0.0));
        let (ctx, rest) = setup(&world);

        assert_eq!(
            rest.attempt(&ctx).await,
            RestOutcome::Skipped(RestSkip::NotEligible)
        );
        assert!(world.actions().is_empty());
        assert!(!ctx.rest_guard().is_held());
    }

    #[tokio::test]
    async fn rain_counts_as_eligible() {
        let world = Arc::new(SimWorld::spawned_at("bot", Vec3::ZERO));
        world.set_raining(true);
        world.add_rest_spot(Vec3::new(1.0, 0.0, 0.0));
        let (ctx, rest) = setup(&world);

        assert!(matches!(rest.attempt(&ctx).await, RestOutcome::Resting { .. }));
    }

    #[tokio::test]
    async fn unspawned_agent_is_skipped() {
        let world = Arc::new(SimWorld::new("bot"));
        let (ctx, rest) = setup(&world);
        assert_eq!(
            rest.attempt(&ctx).await,
            RestOutcome::Skipped(RestSkip::NotSpawned)
        );
    }

    #[tokio::test]
    async fn nearby_spot_at_night_is_used() {
        let world = Arc::new(SimWorld::spawned_at("bot", Vec3::ZERO));
        world.set_night(true);
        world.hold_off_hand(Item::new("shield", 1, 40));
        let spot = Vec3::new(1.5, 0.0, 1.0);
        world.add_rest_spot(spot);
        let (ctx, rest) = setup(&world);

        assert_eq!(rest.attempt(&ctx).await, RestOutcome::Resting { spot });
        assert!(world.state().unwrap().is_sleeping);
        assert_eq!(ctx.rest_guard().phase(), RestPhase::Resting);
        assert!(!ctx.rest_guard().is_held());

        let actions = world.actions();
        let lowered = actions
            .iter()
            .position(|a| *a == WorldAction::DeactivateItem)
            .unwrap();
        let slept = actions
            .iter()
            .position(|a| *a == WorldAction::Sleep(spot))
            .unwrap();
        assert!(lowered < slept);

        assert_eq!(
            rest.attempt(&ctx).await,
            RestOutcome::Skipped(RestSkip::AlreadyResting)
        );
        assert_eq!(ctx.rest_guard().phase(), RestPhase::Resting);
    }

    #[tokio::test]
    async fn far_spot_sets_goal_and_waits() {
        let world = Arc::new(SimWorld::spawned_at("bot", Vec3::ZERO));
        world.set_night(true);
        let spot = Vec3::new(10.0, 0.0, 0.0);
        world.add_rest_spot(spot);
        let (ctx, rest) = setup(&world);

        let outcome = rest.attempt(&ctx).await;
        assert_eq!(
            outcome,
            RestOutcome::Approaching {
                spot,
                distance: 10.0
            }
        );
        assert_eq!(world.goals(), vec![Goal::near(spot, 2.0)]);
        assert_eq!(world.count("sleep"), 0);
        assert_eq!(ctx.rest_guard().phase(), RestPhase::Approaching);

        // Already on the way: no second goal.
        world.set_moving(true);
        rest.attempt(&ctx).await;
        assert_eq!(world.goals().len(), 1);

        world.teleport(Vec3::new(8.5, 0.0, 0.0));
        assert_eq!(rest.attempt(&ctx).await, RestOutcome::Resting { spot });
    }

    #[tokio::test]
    async fn refused_rest_is_reported_not_escalated() {
        let world = Arc::new(SimWorld::spawned_at("bot", Vec3::ZERO));
        world.set_night(true);
        world.add_rest_spot(Vec3::new(1.0, 0.0, 0.0));
        world.reject("sleep");
        let (ctx, rest) = setup(&world);

        assert!(matches!(rest.attempt(&ctx).await, RestOutcome::Refused { .. }));
        assert!(!ctx.rest_guard().is_held());
        assert_eq!(ctx.rest_guard().phase(), RestPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_spot_logs_once_per_window() {
        let world = Arc::new(SimWorld::spawned_at("bot", Vec3::ZERO));
        world.set_night(true);
        world.add_rest_spot(Vec3::new(25.0, 0.0, 0.0));
        let (ctx, rest) = setup(&world);

        assert_eq!(
            rest.attempt(&ctx).await,
            RestOutcome::NoRestSpot { notice_logged: true }
        );
        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(5)).await;
            assert_eq!(
                rest.attempt(&ctx).await,
                RestOutcome::NoRestSpot {
                    notice_logged: false
                }
            );
        }
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(
            rest.attempt(&ctx).await,
            RestOutcome::NoRestSpot { notice_logged: true }
        );

        assert_eq!(world.count("sleep"), 0);
        assert!(world.goals().is_empty());
    }

    #[tokio::test]
    async fn concurrent_triggers_are_serialized() {
        let world = Arc::new(SimWorld::spawned_at("bot", Vec3::ZERO));
        world.set_night(true);
        world.add_rest_spot(Vec3::new(1.0, 0.0, 0.0));
        let gate = Arc::new(Notify::new());
        world.gate_sleep(gate.clone());
        let (ctx, rest) = setup(&world);
        let rest = Arc::new(rest);

        let first = {
            let (ctx, rest) = (ctx.clone(), rest.clone());
            tokio::spawn(async move { rest.attempt(&ctx).await })
        };
        while world.count("sleep") == 0 {
            tokio::task::yield_now().await;
        }

        assert!(ctx.rest_guard().is_held());
        assert_eq!(rest.attempt(&ctx).await, RestOutcome::Busy);

        gate.notify_one();
        assert!(matches!(first.await.unwrap(), RestOutcome::Resting { .. }));
        assert!(!ctx.rest_guard().is_held());
        assert_eq!(world.count("sleep"), 1);
    }

    #[tokio::test]
    async fn cancelled_attempt_releases_guard() {
        let world = Arc::new(SimWorld::spawned_at("bot", Vec3::ZERO));
        world.set_night(true);
        world.add_rest_spot(Vec3::new(1.0, 0.0, 0.0));
        world.gate_sleep(Arc::new(Notify::new()));
        let (ctx, rest) = setup(&world);
        let rest = Arc::new(rest);

        let stuck = {
            let (ctx, rest) = (ctx.clone(), rest.clone());
            tokio::spawn(async move { rest.attempt(&ctx).await })
        };
        while world.count("sleep") == 0 {
            tokio::task::yield_now().await;
        }
        assert!(ctx.rest_guard().is_held());

        stuck.abort();
        assert!(stuck.await.unwrap_err().is_cancelled());
        assert!(!ctx.rest_guard().is_held());
    }
}
