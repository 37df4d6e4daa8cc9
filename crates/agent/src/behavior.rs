//! The decision cycle.
//!
//! Each cycle takes one fresh snapshot of the agent and works down a fixed
//! priority list: combat, then rest, then idle. The first behavior that
//! applies decides how soon the next cycle runs.
//!
//! | situation            | next cycle after               |
//! |----------------------|--------------------------------|
//! | hostile engaged      | `combat.follow_up_ms`          |
//! | asleep               | `rest.sleeping_recheck_ms`     |
//! | anything else        | random `reaction_delay_ms`     |

use std::time::Duration;

use steadyhand_config::AppConfig;
use steadyhand_workflow::{DelayRange, Reschedule, WeightError};

use crate::combat::{CombatController, CombatOutcome};
use crate::context::SessionContext;
use crate::idle::{IdleController, IdleOutcome};

/// What one cycle ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum Cycle {
    NotSpawned,
    Combat(CombatOutcome),
    Sleeping,
    Idle(IdleOutcome),
}

pub struct BehaviorLoop {
    combat: CombatController,
    idle: IdleController,
    reaction: DelayRange,
    follow_up: Duration,
    sleeping_recheck: Duration,
}

impl BehaviorLoop {
    pub fn new(config: &AppConfig) -> Result<Self, WeightError> {
        Ok(Self {
            combat: CombatController::new(config.combat.clone()),
            idle: IdleController::new(&config.behavior)?,
            reaction: DelayRange::from_millis(&config.behavior.reaction_delay_ms),
            follow_up: Duration::from_millis(config.combat.follow_up_ms),
            sleeping_recheck: Duration::from_millis(config.rest.sleeping_recheck_ms),
        })
    }

    pub fn reaction_delay(&self) -> &DelayRange {
        &self.reaction
    }

    pub async fn cycle(&self, ctx: &SessionContext) -> Cycle {
        let Some(state) = ctx.world.state() else {
            return Cycle::NotSpawned;
        };

        let combat = self.combat.evaluate(ctx, &state).await;
        if combat.engaged() {
            return Cycle::Combat(combat);
        }

        if state.is_sleeping {
            return Cycle::Sleeping;
        }

        Cycle::Idle(self.idle.step(ctx, &state).await)
    }

    pub fn reschedule(&self, cycle: &Cycle) -> Reschedule {
        match cycle {
            Cycle::Combat(_) => Reschedule::After(self.follow_up),
            Cycle::Sleeping => Reschedule::After(self.sleeping_recheck),
            Cycle::NotSpawned | Cycle::Idle(_) => Reschedule::UsualDelay,
        }
    }
}
