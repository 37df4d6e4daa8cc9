//! Shared fixtures for controller tests.

use std::sync::Arc;

use steadyhand_config::AppConfig;
use steadyhand_core::{Entity, EntityId, EntityKind, Vec3};
use steadyhand_sim::SimWorld;

use crate::context::SessionContext;

pub fn context(world: &Arc<SimWorld>, config: AppConfig) -> SessionContext {
    SessionContext::new(world.clone(), world.clone(), Arc::new(config)).with_seed(7)
}

pub fn zombie(id: u32, position: Vec3) -> Entity {
    Entity {
        id: EntityId(id),
        kind: EntityKind::Hostile,
        name: "zombie".into(),
        position,
        height: 1.95,
    }
}

pub fn villager(id: u32, position: Vec3) -> Entity {
    Entity {
        id: EntityId(id),
        kind: EntityKind::Passive,
        name: "villager".into(),
        position,
        height: 1.95,
    }
}
