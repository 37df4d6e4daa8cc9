//! Threat response: retreat when hurt, otherwise arm up, block close
//! hits with the shield, and attack.

use tracing::{debug, info};

use steadyhand_config::CombatConfig;
use steadyhand_core::{AgentState, Entity, EntityId, EquipSlot, Goal, Vec3};

use crate::context::{SessionContext, settle};

/// How close a retreat goal has to get.
const RETREAT_GOAL_RANGE: f64 = 1.0;

/// What one combat evaluation did.
#[derive(Debug, Clone, PartialEq)]
pub enum CombatOutcome {
    Disabled,
    /// No qualifying hostile; the shield was lowered.
    Clear,
    Retreated { from: EntityId, goal: Goal },
    /// Shield raised, attack withheld.
    Blocked { target: EntityId },
    Attacked {
        target: EntityId,
        weapon: Option<String>,
    },
}

impl CombatOutcome {
    /// Whether a hostile was dealt with this cycle.
    pub fn engaged(&self) -> bool {
        matches!(
            self,
            CombatOutcome::Retreated { .. }
                | CombatOutcome::Blocked { .. }
                | CombatOutcome::Attacked { .. }
        )
    }
}

pub struct CombatController {
    config: CombatConfig,
}

impl CombatController {
    pub fn new(config: CombatConfig) -> Self {
        Self { config }
    }

    /// Nearest hostile or mob within the kill radius.
    pub fn threat(&self, ctx: &SessionContext, state: &AgentState) -> Option<Entity> {
        let origin = state.position;
        let radius = self.config.kill_radius;
        ctx.world
            .nearest_entity(&|e| e.kind.is_threat() && e.position.distance_to(origin) < radius)
    }

    /// Run one combat evaluation against the given snapshot.
    pub async fn evaluate(&self, ctx: &SessionContext, state: &AgentState) -> CombatOutcome {
        if !self.config.enabled {
            return CombatOutcome::Disabled;
        }

        let Some(hostile) = self.threat(ctx, state) else {
            settle("deactivate_item", ctx.world.deactivate_item().await);
            return CombatOutcome::Clear;
        };

        if state.health <= self.config.retreat_health {
            return self.retreat(ctx, state, &hostile).await;
        }

        self.engage(ctx, state, &hostile).await
    }

    async fn retreat(
        &self,
        ctx: &SessionContext,
        state: &AgentState,
        hostile: &Entity,
    ) -> CombatOutcome {
        let away = (state.position - hostile.position)
            .normalized()
            .unwrap_or(Vec3::new(1.0, 0.0, 0.0));
        let point = state.position + away * self.config.retreat_distance;
        let goal = Goal::near(point, RETREAT_GOAL_RANGE);

        info!(
            health = state.health,
            hostile = %hostile.name,
            "Health low, retreating"
        );
        ctx.navigator.set_goal(goal);
        settle("deactivate_item", ctx.world.deactivate_item().await);

        CombatOutcome::Retreated {
            from: hostile.id,
            goal,
        }
    }

    async fn engage(
        &self,
        ctx: &SessionContext,
        state: &AgentState,
        hostile: &Entity,
    ) -> CombatOutcome {
        let weapon = state
            .find_item(|item| self.config.preferred_weapons.contains(&item.name))
            .cloned();
        if let Some(weapon) = &weapon {
            settle(
                "equip",
                ctx.world.equip(weapon, EquipSlot::MainHand).await,
            );
        }

        // Judged before this cycle's equip request lands.
        let shield_ready = state.equipment.off_hand_is(&self.config.shield_item);
        if !shield_ready {
            if let Some(shield) = state.item_named(&self.config.shield_item) {
                settle("equip", ctx.world.equip(shield, EquipSlot::OffHand).await);
            }
        }

        settle(
            "look_at",
            ctx.world
                .look_at(hostile.position.offset(0.0, hostile.height, 0.0))
                .await,
        );

        let distance = hostile.position.distance_to(state.position);
        if shield_ready && distance < self.config.block_range {
            settle("activate_item", ctx.world.activate_item(true).await);
            debug!(hostile = %hostile.name, distance, "Blocking");
            return CombatOutcome::Blocked { target: hostile.id };
        }

        settle("deactivate_item", ctx.world.deactivate_item().await);
        settle("attack", ctx.world.attack(hostile.id).await);
        debug!(hostile = %hostile.name, distance, "Attacking");

        CombatOutcome::Attacked {
            target: hostile.id,
            weapon: weapon.map(|w| w.name),
        }
    }
}
