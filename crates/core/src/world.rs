//! World and Navigator traits: the abstraction over the game client.
//!
//! A [`World`] exposes read access to the agent's surroundings and accepts
//! action requests. A [`Navigator`] accepts movement goals and reports
//! whether the agent is currently walking a path. Both are implemented by the
//! protocol client; the controllers only ever talk to these traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::{AgentState, Entity, EntityId, EquipSlot, Item};
use crate::error::WorldResult;
use crate::geometry::Vec3;

/// A transient input the agent can hold down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Forward,
    Back,
    Left,
    Right,
    Jump,
    Sneak,
    Sprint,
}

/// A movement goal handed to the navigator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Goal {
    /// Get within `range` of a point.
    Near { target: Vec3, range: f64 },
    /// Reach the given column, any height.
    Xz { x: f64, z: f64 },
}

impl Goal {
    pub fn near(target: Vec3, range: f64) -> Self {
        Goal::Near { target, range }
    }
}

/// Movement restrictions applied to the navigator for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementProfile {
    pub can_dig: bool,
    pub allow_parkour: bool,
    pub allow_sprinting: bool,
    pub can_open_doors: bool,
}

impl MovementProfile {
    /// Never breaks blocks, jumps gaps, sprints, or opens doors while pathing.
    pub const fn safe() -> Self {
        Self {
            can_dig: false,
            allow_parkour: false,
            allow_sprinting: false,
            can_open_doors: false,
        }
    }
}

impl Default for MovementProfile {
    fn default() -> Self {
        Self::safe()
    }
}

/// The game-world interface.
///
/// Read methods are synchronous and always return live values. Request
/// methods may fail; a failure never ends the session.
#[async_trait]
pub trait World: Send + Sync {
    /// Name the agent is logged in as.
    fn username(&self) -> &str;

    /// Current snapshot, or `None` until the agent has spawned.
    fn state(&self) -> Option<AgentState>;

    /// Nearest entity (by the world's own distance ordering) that satisfies
    /// the filter.
    fn nearest_entity(&self, filter: &(dyn Fn(&Entity) -> bool + Sync)) -> Option<Entity>;

    /// Nearest place to rest within `max_distance`.
    fn find_rest_spot(&self, max_distance: f64) -> Option<Vec3>;

    async fn equip(&self, item: &Item, slot: EquipSlot) -> WorldResult<()>;

    async fn attack(&self, target: EntityId) -> WorldResult<()>;

    /// Start using the held item (raising a shield when `off_hand`).
    async fn activate_item(&self, off_hand: bool) -> WorldResult<()>;

    /// Stop using the held item. A no-op when nothing is active.
    async fn deactivate_item(&self) -> WorldResult<()>;

    async fn look(&self, yaw: f32, pitch: f32, force: bool) -> WorldResult<()>;

    async fn look_at(&self, point: Vec3) -> WorldResult<()>;

    async fn set_control_state(&self, control: Control, pressed: bool) -> WorldResult<()>;

    async fn swing_arm(&self) -> WorldResult<()>;

    async fn chat(&self, text: &str) -> WorldResult<()>;

    /// Eat or drink the item in the main hand.
    async fn consume(&self) -> WorldResult<()>;

    /// Lie down at a rest spot.
    async fn sleep_in(&self, spot: Vec3) -> WorldResult<()>;
}

/// The pathfinding engine.
pub trait Navigator: Send + Sync {
    /// Replace the current goal.
    fn set_goal(&self, goal: Goal);

    /// Whether a path is currently being walked.
    fn is_moving(&self) -> bool;

    fn set_profile(&self, profile: MovementProfile);
}
