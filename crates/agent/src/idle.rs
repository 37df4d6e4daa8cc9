//! Idle behavior between threats: stay inside the confinement zone, glance
//! around, take a short step now and then, or do nothing at all.

use rand::Rng;
use tracing::debug;

use steadyhand_config::{BehaviorConfig, ConfinementConfig};
use steadyhand_core::{AgentState, Goal};
use steadyhand_workflow::{WeightError, WeightedTable};

use crate::context::{SessionContext, settle};

const LOOK_YAW: f32 = 0.5;
const LOOK_PITCH: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleAction {
    Look,
    Wander,
    Nothing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IdleOutcome {
    Disabled,
    /// Outside the zone; walking back to its center.
    Confined { goal: Goal },
    Looked { yaw: f32, pitch: f32 },
    Wandered { goal: Goal },
    /// Wander drawn while already moving.
    StillMoving,
    Nothing,
}

pub struct IdleController {
    enabled: bool,
    move_radius: f64,
    confinement: ConfinementConfig,
    table: WeightedTable<IdleAction>,
}

impl IdleController {
    pub fn new(config: &BehaviorConfig) -> Result<Self, WeightError> {
        let weights = &config.idle_weights;
        let table = WeightedTable::new(vec![
            (IdleAction::Look, weights.look),
            (IdleAction::Wander, weights.wander),
            (IdleAction::Nothing, weights.nothing),
        ])?;
        Ok(Self {
            enabled: config.enabled,
            move_radius: config.move_radius,
            confinement: config.confinement,
            table,
        })
    }

    pub fn table(&self) -> &WeightedTable<IdleAction> {
        &self.table
    }

    pub async fn step(&self, ctx: &SessionContext, state: &AgentState) -> IdleOutcome {
        if !self.enabled {
            return IdleOutcome::Disabled;
        }

        if let Some(goal) = self.confinement_goal(state) {
            debug!(position = %state.position, "Outside confinement, returning");
            ctx.navigator.set_goal(goal);
            return IdleOutcome::Confined { goal };
        }

        let action = ctx.with_rng(|rng| self.table.pick(rng));
        self.perform(ctx, state, action).await
    }

    /// Carry out a specific idle action.
    pub async fn perform(
        &self,
        ctx: &SessionContext,
        state: &AgentState,
        action: IdleAction,
    ) -> IdleOutcome {
        match action {
            IdleAction::Look => {
                let (yaw, pitch) = ctx.with_rng(|rng| {
                    (
                        state.yaw + rng.random_range(-LOOK_YAW..=LOOK_YAW),
                        state.pitch + rng.random_range(-LOOK_PITCH..=LOOK_PITCH),
                    )
                });
                settle("look", ctx.world.look(yaw, pitch, false).await);
                IdleOutcome::Looked { yaw, pitch }
            }
            IdleAction::Wander => {
                if ctx.navigator.is_moving() {
                    return IdleOutcome::StillMoving;
                }
                let r = self.move_radius;
                let goal = ctx.with_rng(|rng| Goal::Xz {
                    x: state.position.x + rng.random_range(-r..=r),
                    z: state.position.z + rng.random_range(-r..=r),
                });
                ctx.navigator.set_goal(goal);
                IdleOutcome::Wandered { goal }
            }
            IdleAction::Nothing => IdleOutcome::Nothing,
        }
    }

    fn confinement_goal(&self, state: &AgentState) -> Option<Goal> {
        if !self.confinement.enabled {
            return None;
        }
        let center = self.confinement.center();
        if state.position.distance_to(center) <= self.confinement.radius {
            return None;
        }
        let range = (self.confinement.radius - 0.25).max(0.5);
        Some(Goal::near(center, range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use steadyhand_config::AppConfig;
    use steadyhand_core::{Vec3, World};
    use steadyhand_sim::SimWorld;

    use crate::test_helpers::context;

    fn setup(config: AppConfig) -> (Arc<SimWorld>, SessionContext, IdleController) {
        let world = Arc::new(SimWorld::spawned_at("bot", Vec3::new(10.0, 64.0, 10.0)));
        let idle = IdleController::new(&config.behavior).unwrap();
        let ctx = context(&world, config);
        (world, ctx, idle)
    }

    #[test]
    fn default_table_matches_weights() {
        let idle = IdleController::new(&BehaviorConfig::default()).unwrap();
        let table = idle.table();
        assert_eq!(table.total(), 10);
        assert_eq!(table.pick_at(0), IdleAction::Look);
        assert_eq!(table.pick_at(3), IdleAction::Wander);
        assert_eq!(table.pick_at(4), IdleAction::Nothing);
    }

    #[tokio::test]
    async fn look_stays_within_jitter() {
        let (world, ctx, idle) = setup(AppConfig::default());
        for _ in 0..50 {
            let before = world.state().unwrap();
            let IdleOutcome::Looked { yaw, pitch } =
                idle.perform(&ctx, &before, IdleAction::Look).await
            else {
                panic!("expected a look");
            };
            assert!((yaw - before.yaw).abs() <= LOOK_YAW + 1e-4);
            assert!((pitch - before.pitch).abs() <= LOOK_PITCH + 1e-4);
        }
    }

    #[tokio::test]
    async fn wander_stays_within_move_radius() {
        let (world, ctx, idle) = setup(AppConfig::default());
        let state = world.state().unwrap();
        for _ in 0..50 {
            let IdleOutcome::Wandered { goal } =
                idle.perform(&ctx, &state, IdleAction::Wander).await
            else {
                panic!("expected a wander");
            };
            let Goal::Xz { x, z } = goal else {
                panic!("wander goal should be a column");
            };
            assert!((x - 10.0).abs() <= 2.0);
            assert!((z - 10.0).abs() <= 2.0);
        }
    }

    #[tokio::test]
    async fn wander_waits_for_current_move() {
        let (world, ctx, idle) = setup(AppConfig::default());
        world.set_moving(true);
        let state = world.state().unwrap();
        assert_eq!(
            idle.perform(&ctx, &state, IdleAction::Wander).await,
            IdleOutcome::StillMoving
        );
        assert!(world.goals().is_empty());
    }

    #[tokio::test]
    async fn nothing_band_makes_no_requests() {
        let (world, ctx, idle) = setup(AppConfig::default());
        let state = world.state().unwrap();
        assert_eq!(
            idle.perform(&ctx, &state, IdleAction::Nothing).await,
            IdleOutcome::Nothing
        );
        assert!(world.actions().is_empty());
    }

    #[tokio::test]
    async fn confinement_pulls_agent_back() {
        let mut config = AppConfig::default();
        config.behavior.confinement.enabled = true;
        config.behavior.confinement.x = 0.0;
        config.behavior.confinement.y = 64.0;
        config.behavior.confinement.z = 0.0;
        let (world, ctx, idle) = setup(config);

        let state = world.state().unwrap();
        let outcome = idle.step(&ctx, &state).await;
        assert_eq!(
            outcome,
            IdleOutcome::Confined {
                goal: Goal::near(Vec3::new(0.0, 64.0, 0.0), 1.25)
            }
        );
    }

    #[tokio::test]
    async fn small_confinement_radius_keeps_minimum_range() {
        let mut config = AppConfig::default();
        config.behavior.confinement.enabled = true;
        config.behavior.confinement.radius = 0.5;
        let (world, ctx, idle) = setup(config);

        let state = world.state().unwrap();
        let IdleOutcome::Confined { goal } = idle.step(&ctx, &state).await else {
            panic!("expected confinement");
        };
        assert_eq!(goal, Goal::near(Vec3::ZERO, 0.5));
    }

    #[tokio::test]
    async fn disabled_behavior_skips_idle() {
        let mut config = AppConfig::default();
        config.behavior.enabled = false;
        let (world, ctx, idle) = setup(config);
        let state = world.state().unwrap();
        assert_eq!(idle.step(&ctx, &state).await, IdleOutcome::Disabled);
    }
}
