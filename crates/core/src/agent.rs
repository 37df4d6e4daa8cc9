//! Agent state snapshot types.
//!
//! The world interface owns the live state; controllers receive a fresh
//! [`AgentState`] every time they call `World::state()` and never keep one
//! across cycles.

use serde::{Deserialize, Serialize};

use crate::geometry::Vec3;

/// Unique identifier of an entity in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Broad entity classification as reported by the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Hostile,
    /// Generic mob the world could not classify further.
    Mob,
    Passive,
    Player,
    Object,
}

impl EntityKind {
    /// Whether the combat controller treats this kind as a threat.
    pub fn is_threat(self) -> bool {
        matches!(self, EntityKind::Hostile | EntityKind::Mob)
    }
}

/// Another entity visible to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub position: Vec3,
    /// Height of the bounding box, used to aim at the head.
    pub height: f64,
}

/// An inventory stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub count: u32,
    /// Inventory slot index reported by the world.
    pub slot: u16,
}

impl Item {
    pub fn new(name: impl Into<String>, count: u32, slot: u16) -> Self {
        Self {
            name: name.into(),
            count,
            slot,
        }
    }
}

/// Where an item can be equipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    MainHand,
    OffHand,
}

/// Currently held items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_hand: Option<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub off_hand: Option<Item>,
}

impl Equipment {
    /// Whether the off hand holds an item with the given name.
    pub fn off_hand_is(&self, name: &str) -> bool {
        self.off_hand.as_ref().is_some_and(|item| item.name == name)
    }
}

/// Time-of-day and weather flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub is_night: bool,
    pub is_raining: bool,
}

/// Read-only snapshot of the agent's vitals and surroundings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub health: f32,
    pub food: f32,
    pub environment: Environment,
    pub is_sleeping: bool,
    #[serde(default)]
    pub inventory: Vec<Item>,
    #[serde(default)]
    pub equipment: Equipment,
}

impl AgentState {
    /// A healthy, fed agent at the given position with an empty inventory.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            health: 20.0,
            food: 20.0,
            environment: Environment::default(),
            is_sleeping: false,
            inventory: Vec::new(),
            equipment: Equipment::default(),
        }
    }

    /// First inventory item whose name satisfies the predicate.
    pub fn find_item(&self, mut predicate: impl FnMut(&Item) -> bool) -> Option<&Item> {
        self.inventory.iter().find(|item| predicate(item))
    }

    /// First inventory item with exactly this name.
    pub fn item_named(&self, name: &str) -> Option<&Item> {
        self.find_item(|item| item.name == name)
    }
}
