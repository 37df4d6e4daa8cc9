//! Small cosmetic motions on their own slow cadence.
//!
//! Runs as a separate task from the decision loop. It never sets movement
//! goals and stays still while the agent is walking or asleep.

use rand::Rng;
use std::time::Duration;
use tracing::debug;

use steadyhand_config::HumanizerConfig;
use steadyhand_core::Control;
use steadyhand_workflow::{DelayRange, WeightError, WeightedTable};

use crate::context::{SessionContext, settle};

const JITTER_YAW: f32 = 0.35;
const JITTER_PITCH: f32 = 0.125;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    LookJitter,
    Crouch,
    Jump,
    SwingArm,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HumanizerOutcome {
    NotSpawned,
    /// Moving or sleeping.
    Busy,
    Performed(Gesture),
}

pub struct HumanizerController {
    interval: DelayRange,
    sneak_hold: DelayRange,
    jump_hold: DelayRange,
    table: WeightedTable<Gesture>,
}

impl HumanizerController {
    pub fn new(config: &HumanizerConfig) -> Result<Self, WeightError> {
        let weights = &config.weights;
        let table = WeightedTable::new(vec![
            (Gesture::LookJitter, weights.look),
            (Gesture::Crouch, weights.crouch),
            (Gesture::Jump, weights.jump),
            (Gesture::SwingArm, weights.swing),
        ])?;
        Ok(Self {
            interval: DelayRange::from_secs(&config.interval_secs),
            sneak_hold: DelayRange::from_millis(&config.sneak_hold_ms),
            jump_hold: DelayRange::from_millis(&config.jump_hold_ms),
            table,
        })
    }

    pub fn interval(&self) -> &DelayRange {
        &self.interval
    }

    pub async fn step(&self, ctx: &SessionContext) -> HumanizerOutcome {
        let Some(state) = ctx.world.state() else {
            return HumanizerOutcome::NotSpawned;
        };
        if state.is_sleeping || ctx.navigator.is_moving() {
            return HumanizerOutcome::Busy;
        }

        let gesture = ctx.with_rng(|rng| self.table.pick(rng));
        debug!(?gesture, "Humanizer gesture");

        match gesture {
            Gesture::LookJitter => {
                let (yaw, pitch) = ctx.with_rng(|rng| {
                    (
                        state.yaw + rng.random_range(-JITTER_YAW..=JITTER_YAW),
                        state.pitch + rng.random_range(-JITTER_PITCH..=JITTER_PITCH),
                    )
                });
                settle("look", ctx.world.look(yaw, pitch, true).await);
            }
            Gesture::Crouch => {
                let hold = ctx.sample(&self.sneak_hold);
                pulse(ctx, Control::Sneak, hold).await;
            }
            Gesture::Jump => {
                let hold = ctx.sample(&self.jump_hold);
                pulse(ctx, Control::Jump, hold).await;
            }
            Gesture::SwingArm => {
                settle("swing_arm", ctx.world.swing_arm().await);
            }
        }

        HumanizerOutcome::Performed(gesture)
    }
}

/// Press a control, hold it, release it.
async fn pulse(ctx: &SessionContext, control: Control, hold: Duration) {
    if !settle(
        "set_control_state",
        ctx.world.set_control_state(control, true).await,
    ) {
        return;
    }
    tokio::time::sleep(hold).await;
    settle(
        "set_control_state",
        ctx.world.set_control_state(control, false).await,
    );
}
