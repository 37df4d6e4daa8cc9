//! In-memory world, used for testing and offline runs.
//!
//! `SimWorld` implements both [`World`] and [`Navigator`]. It keeps a plain
//! snapshot of the agent and its surroundings, applies requests to it with
//! very simple rules, and records every request so tests can assert on
//! exactly what the controllers asked for.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

use steadyhand_core::{
    AgentState, Control, Entity, EntityId, EquipSlot, Goal, Item, MovementProfile, Navigator,
    Vec3, World, WorldError, WorldResult,
};

/// Agents farther than this from a rest spot cannot use it.
const SLEEP_REACH: f64 = 3.0;

/// One request the world received.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldAction {
    Equip { item: String, slot: EquipSlot },
    Attack(EntityId),
    ActivateItem { off_hand: bool },
    DeactivateItem,
    Look { yaw: f32, pitch: f32, force: bool },
    LookAt(Vec3),
    Control { control: Control, pressed: bool },
    SwingArm,
    Chat(String),
    Consume,
    Sleep(Vec3),
    SetGoal(Goal),
    SetProfile(MovementProfile),
}

impl WorldAction {
    /// Short name used for counting and failure injection.
    pub fn kind(&self) -> &'static str {
        match self {
            WorldAction::Equip { .. } => "equip",
            WorldAction::Attack(_) => "attack",
            WorldAction::ActivateItem { .. } => "activate_item",
            WorldAction::DeactivateItem => "deactivate_item",
            WorldAction::Look { .. } => "look",
            WorldAction::LookAt(_) => "look_at",
            WorldAction::Control { .. } => "control",
            WorldAction::SwingArm => "swing_arm",
            WorldAction::Chat(_) => "chat",
            WorldAction::Consume => "consume",
            WorldAction::Sleep(_) => "sleep",
            WorldAction::SetGoal(_) => "set_goal",
            WorldAction::SetProfile(_) => "set_profile",
        }
    }
}

#[derive(Debug, Default)]
struct SimState {
    agent: Option<AgentState>,
    entities: Vec<Entity>,
    rest_spots: Vec<Vec3>,
    moving: bool,
    instant_travel: bool,
    shield_raised: bool,
    held_controls: HashSet<Control>,
    profile: Option<MovementProfile>,
    rejected: HashSet<&'static str>,
    actions: Vec<WorldAction>,
}

/// A scriptable in-memory world.
pub struct SimWorld {
    username: String,
    state: Mutex<SimState>,
    sleep_gate: Mutex<Option<Arc<Notify>>>,
}

impl SimWorld {
    /// A world where the agent has not spawned yet.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            state: Mutex::new(SimState::default()),
            sleep_gate: Mutex::new(None),
        }
    }

    /// A world with the agent already spawned at `position`.
    pub fn spawned_at(username: impl Into<String>, position: Vec3) -> Self {
        let world = Self::new(username);
        world.spawn(AgentState::at(position));
        world
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a request, or reject it if its kind was marked with [`reject`].
    ///
    /// [`reject`]: SimWorld::reject
    fn record(&self, action: WorldAction) -> WorldResult<()> {
        let mut state = self.lock();
        let kind = action.kind();
        state.actions.push(action);
        if state.rejected.contains(kind) {
            return Err(WorldError::rejected(kind, "rejected by simulation"));
        }
        if state.agent.is_none() {
            return Err(WorldError::NotSpawned);
        }
        Ok(())
    }

    fn with_agent(&self, f: impl FnOnce(&mut AgentState)) {
        if let Some(agent) = self.lock().agent.as_mut() {
            f(agent);
        }
    }

    // ── Scenario setup ──────────────────────────────────────────────────

    pub fn spawn(&self, agent: AgentState) {
        self.lock().agent = Some(agent);
    }

    pub fn despawn(&self) {
        self.lock().agent = None;
    }

    pub fn teleport(&self, position: Vec3) {
        self.with_agent(|agent| agent.position = position);
    }

    pub fn set_health(&self, health: f32) {
        self.with_agent(|agent| agent.health = health);
    }

    pub fn set_food(&self, food: f32) {
        self.with_agent(|agent| agent.food = food);
    }

    /// Daybreak also wakes a sleeping agent.
    pub fn set_night(&self, is_night: bool) {
        self.with_agent(|agent| {
            agent.environment.is_night = is_night;
            if !is_night && !agent.environment.is_raining {
                agent.is_sleeping = false;
            }
        });
    }

    pub fn set_raining(&self, is_raining: bool) {
        self.with_agent(|agent| agent.environment.is_raining = is_raining);
    }

    pub fn set_sleeping(&self, is_sleeping: bool) {
        self.with_agent(|agent| agent.is_sleeping = is_sleeping);
    }

    pub fn give(&self, item: Item) {
        self.with_agent(|agent| agent.inventory.push(item));
    }

    /// Put an item straight into the off hand.
    pub fn hold_off_hand(&self, item: Item) {
        self.with_agent(|agent| agent.equipment.off_hand = Some(item));
    }

    pub fn add_entity(&self, entity: Entity) {
        self.lock().entities.push(entity);
    }

    pub fn remove_entity(&self, id: EntityId) {
        self.lock().entities.retain(|e| e.id != id);
    }

    pub fn add_rest_spot(&self, spot: Vec3) {
        self.lock().rest_spots.push(spot);
    }

    pub fn set_moving(&self, moving: bool) {
        self.lock().moving = moving;
    }

    /// When set, a new goal teleports the agent onto its target.
    pub fn set_instant_travel(&self, enabled: bool) {
        self.lock().instant_travel = enabled;
    }

    /// Make every request of this kind fail.
    pub fn reject(&self, kind: &'static str) {
        self.lock().rejected.insert(kind);
    }

    /// Hold every `sleep_in` call until the gate is notified.
    pub fn gate_sleep(&self, gate: Arc<Notify>) {
        *self.sleep_gate.lock().unwrap_or_else(|e| e.into_inner()) = Some(gate);
    }

    // ── Inspection ──────────────────────────────────────────────────────

    /// Every request received so far, in order.
    pub fn actions(&self) -> Vec<WorldAction> {
        self.lock().actions.clone()
    }

    /// Drain the request log.
    pub fn take_actions(&self) -> Vec<WorldAction> {
        std::mem::take(&mut self.lock().actions)
    }

    /// How many requests of this kind were received.
    pub fn count(&self, kind: &str) -> usize {
        self.lock().actions.iter().filter(|a| a.kind() == kind).count()
    }

    /// Goals set so far, in order.
    pub fn goals(&self) -> Vec<Goal> {
        self.lock()
            .actions
            .iter()
            .filter_map(|a| match a {
                WorldAction::SetGoal(goal) => Some(*goal),
                _ => None,
            })
            .collect()
    }

    pub fn shield_raised(&self) -> bool {
        self.lock().shield_raised
    }

    pub fn is_held(&self, control: Control) -> bool {
        self.lock().held_controls.contains(&control)
    }

    pub fn profile(&self) -> Option<MovementProfile> {
        self.lock().profile
    }
}

#[async_trait]
impl World for SimWorld {
    fn username(&self) -> &str {
        &self.username
    }

    fn state(&self) -> Option<AgentState> {
        self.lock().agent.clone()
    }

    fn nearest_entity(&self, filter: &(dyn Fn(&Entity) -> bool + Sync)) -> Option<Entity> {
        let state = self.lock();
        let origin = state.agent.as_ref()?.position;
        state
            .entities
            .iter()
            .filter(|e| filter(e))
            .min_by(|a, b| {
                origin
                    .distance_to(a.position)
                    .total_cmp(&origin.distance_to(b.position))
            })
            .cloned()
    }

    fn find_rest_spot(&self, max_distance: f64) -> Option<Vec3> {
        let state = self.lock();
        let origin = state.agent.as_ref()?.position;
        state
            .rest_spots
            .iter()
            .copied()
            .filter(|spot| origin.distance_to(*spot) <= max_distance)
            .min_by(|a, b| origin.distance_to(*a).total_cmp(&origin.distance_to(*b)))
    }

    async fn equip(&self, item: &Item, slot: EquipSlot) -> WorldResult<()> {
        self.record(WorldAction::Equip {
            item: item.name.clone(),
            slot,
        })?;
        let mut state = self.lock();
        let Some(agent) = state.agent.as_mut() else {
            return Err(WorldError::NotSpawned);
        };
        if !agent.inventory.iter().any(|i| i.name == item.name) {
            return Err(WorldError::ItemNotFound(item.name.clone()));
        }
        match slot {
            EquipSlot::MainHand => agent.equipment.main_hand = Some(item.clone()),
            EquipSlot::OffHand => agent.equipment.off_hand = Some(item.clone()),
        }
        Ok(())
    }

    async fn attack(&self, target: EntityId) -> WorldResult<()> {
        self.record(WorldAction::Attack(target))?;
        if self.lock().entities.iter().any(|e| e.id == target) {
            Ok(())
        } else {
            Err(WorldError::Unreachable(target.to_string()))
        }
    }

    async fn activate_item(&self, off_hand: bool) -> WorldResult<()> {
        self.record(WorldAction::ActivateItem { off_hand })?;
        self.lock().shield_raised = off_hand;
        Ok(())
    }

    async fn deactivate_item(&self) -> WorldResult<()> {
        self.record(WorldAction::DeactivateItem)?;
        self.lock().shield_raised = false;
        Ok(())
    }

    async fn look(&self, yaw: f32, pitch: f32, force: bool) -> WorldResult<()> {
        self.record(WorldAction::Look { yaw, pitch, force })?;
        self.with_agent(|agent| {
            agent.yaw = yaw;
            agent.pitch = pitch;
        });
        Ok(())
    }

    async fn look_at(&self, point: Vec3) -> WorldResult<()> {
        self.record(WorldAction::LookAt(point))
    }

    async fn set_control_state(&self, control: Control, pressed: bool) -> WorldResult<()> {
        self.record(WorldAction::Control { control, pressed })?;
        let mut state = self.lock();
        if pressed {
            state.held_controls.insert(control);
        } else {
            state.held_controls.remove(&control);
        }
        Ok(())
    }

    async fn swing_arm(&self) -> WorldResult<()> {
        self.record(WorldAction::SwingArm)
    }

    async fn chat(&self, text: &str) -> WorldResult<()> {
        self.record(WorldAction::Chat(text.to_string()))
    }

    async fn consume(&self) -> WorldResult<()> {
        self.record(WorldAction::Consume)?;
        let mut state = self.lock();
        let Some(agent) = state.agent.as_mut() else {
            return Err(WorldError::NotSpawned);
        };
        let Some(held) = agent.equipment.main_hand.take() else {
            return Err(WorldError::rejected("consume", "nothing in hand"));
        };
        if let Some(pos) = agent.inventory.iter().position(|i| i.name == held.name) {
            let stack = &mut agent.inventory[pos];
            stack.count = stack.count.saturating_sub(1);
            if stack.count == 0 {
                agent.inventory.remove(pos);
            } else {
                agent.equipment.main_hand = Some(stack.clone());
            }
        }
        agent.food = 20.0;
        Ok(())
    }

    async fn sleep_in(&self, spot: Vec3) -> WorldResult<()> {
        self.record(WorldAction::Sleep(spot))?;

        let gate = self
            .sleep_gate
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.lock();
        let Some(agent) = state.agent.as_mut() else {
            return Err(WorldError::NotSpawned);
        };
        if agent.position.distance_to(spot) > SLEEP_REACH {
            return Err(WorldError::rejected("sleep", "too far away"));
        }
        if !agent.environment.is_night && !agent.environment.is_raining {
            return Err(WorldError::rejected("sleep", "can only sleep at night"));
        }
        agent.is_sleeping = true;
        Ok(())
    }
}

impl Navigator for SimWorld {
    fn set_goal(&self, goal: Goal) {
        let mut state = self.lock();
        state.actions.push(WorldAction::SetGoal(goal));
        if state.instant_travel {
            if let Some(agent) = state.agent.as_mut() {
                match goal {
                    Goal::Near { target, .. } => agent.position = target,
                    Goal::Xz { x, z } => {
                        agent.position.x = x;
                        agent.position.z = z;
                    }
                }
            }
        }
    }

    fn is_moving(&self) -> bool {
        self.lock().moving
    }

    fn set_profile(&self, profile: MovementProfile) {
        let mut state = self.lock();
        state.actions.push(WorldAction::SetProfile(profile));
        state.profile = Some(profile);
    }
}
