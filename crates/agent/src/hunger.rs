//! Eat something when food or health runs low.

use std::time::Duration;
use tracing::{debug, info};

use steadyhand_config::HungerConfig;
use steadyhand_core::{AgentState, EquipSlot, Item};

use crate::context::SessionContext;

#[derive(Debug, Clone, PartialEq)]
pub enum HungerOutcome {
    NotSpawned,
    Satisfied,
    NoFood,
    Ate(String),
    Failed { item: String, reason: String },
}

pub struct HungerMaintainer {
    config: HungerConfig,
}

impl HungerMaintainer {
    pub fn new(config: HungerConfig) -> Self {
        Self { config }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.config.check_interval_ms)
    }

    pub fn is_hungry(&self, state: &AgentState) -> bool {
        state.food < self.config.food_threshold || state.health < self.config.health_threshold
    }

    /// First inventory item whose name contains a food keyword.
    pub fn pick_food<'a>(&self, state: &'a AgentState) -> Option<&'a Item> {
        state.find_item(|item| {
            self.config
                .food_keywords
                .iter()
                .any(|keyword| item.name.contains(keyword.as_str()))
        })
    }

    pub async fn check(&self, ctx: &SessionContext) -> HungerOutcome {
        let Some(state) = ctx.world.state() else {
            return HungerOutcome::NotSpawned;
        };
        if !self.is_hungry(&state) {
            return HungerOutcome::Satisfied;
        }
        let Some(food) = self.pick_food(&state) else {
            debug!(food = state.food, "Hungry but nothing to eat");
            return HungerOutcome::NoFood;
        };

        let eaten = match ctx.world.equip(food, EquipSlot::MainHand).await {
            Ok(()) => ctx.world.consume().await,
            Err(e) => Err(e),
        };
        match eaten {
            Ok(()) => {
                info!(item = %food.name, food = state.food, health = state.health, "Ate");
                HungerOutcome::Ate(food.name.clone())
            }
            Err(e) => {
                debug!(item = %food.name, error = %e, "Could not eat");
                HungerOutcome::Failed {
                    item: food.name.clone(),
                    reason: e.to_string(),
                }
            }
        }
    }
}
