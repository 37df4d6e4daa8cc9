//! Scripted connector handing out simulated sessions.
//!
//! Each call to `connect` consumes the next [`ConnectScript`]. Accepted
//! sessions get a fresh [`SimWorld`] plus an event channel; the scripted
//! events are replayed on a background task and the sender is kept so tests
//! can push more. With an empty queue the connector either refuses or, in
//! demo mode, produces a self-driving day/night session.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use steadyhand_core::{
    AgentState, ConnectOptions, Connection, Connector, Entity, EntityId, EntityKind, Item,
    SessionError, Vec3, WorldEvent,
};

use crate::world::SimWorld;

/// What happens on one connection attempt.
pub enum ConnectScript {
    /// Fail to connect.
    Refuse(String),
    /// Open a session and replay events at the given offsets from connect.
    Accept {
        world: Arc<SimWorld>,
        events: Vec<(Duration, WorldEvent)>,
    },
}

impl ConnectScript {
    /// A session that spawns immediately and stays open.
    pub fn spawn_and_stay(world: Arc<SimWorld>) -> Self {
        ConnectScript::Accept {
            world,
            events: vec![(Duration::ZERO, WorldEvent::Spawn)],
        }
    }
}

/// Handle to an accepted session, kept for inspection.
#[derive(Clone)]
pub struct SimSession {
    pub world: Arc<SimWorld>,
    pub events: mpsc::Sender<WorldEvent>,
}

pub struct SimConnector {
    scripts: Mutex<VecDeque<ConnectScript>>,
    sessions: Mutex<Vec<SimSession>>,
    attempts: Mutex<u32>,
    demo: bool,
}

impl SimConnector {
    pub fn new(scripts: Vec<ConnectScript>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            sessions: Mutex::new(Vec::new()),
            attempts: Mutex::new(0),
            demo: false,
        }
    }

    /// Connector that always accepts with a self-driving demo world.
    pub fn demo() -> Self {
        Self {
            demo: true,
            ..Self::new(Vec::new())
        }
    }

    /// Queue another script.
    pub fn push(&self, script: ConnectScript) {
        self.scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(script);
    }

    /// Every accepted session so far.
    pub fn sessions(&self) -> Vec<SimSession> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of `connect` calls so far, accepted or not.
    pub fn attempts(&self) -> u32 {
        *self.attempts.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_script(&self, options: &ConnectOptions) -> Option<ConnectScript> {
        let scripted = self
            .scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match scripted {
            Some(script) => Some(script),
            None if self.demo => Some(ConnectScript::Accept {
                world: Arc::new(demo_world(&options.username)),
                events: vec![(Duration::from_millis(500), WorldEvent::Spawn)],
            }),
            None => None,
        }
    }
}

#[async_trait]
impl Connector for SimConnector {
    fn name(&self) -> &str {
        "sim"
    }

    async fn connect(&self, options: &ConnectOptions) -> Result<Connection, SessionError> {
        *self.attempts.lock().unwrap_or_else(|e| e.into_inner()) += 1;

        let refuse = |reason: String| SessionError::ConnectFailed {
            host: options.host.clone(),
            port: options.port,
            reason,
        };

        let (world, events) = match self.next_script(options) {
            Some(ConnectScript::Accept { world, events }) => (world, events),
            Some(ConnectScript::Refuse(reason)) => return Err(refuse(reason)),
            None => return Err(refuse("no scripted session left".into())),
        };

        let (tx, rx) = mpsc::channel(64);
        let replay_tx = tx.clone();
        tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            for (offset, event) in events {
                tokio::time::sleep_until(started + offset).await;
                debug!(?event, "Replaying scripted event");
                if replay_tx.send(event).await.is_err() {
                    return;
                }
            }
        });

        if self.demo {
            tokio::spawn(drive_demo(world.clone(), tx.clone()));
        }

        info!(host = %options.host, port = options.port, "Simulated connection opened");
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SimSession {
                world: world.clone(),
                events: tx,
            });

        Ok(Connection {
            world: world.clone(),
            navigator: world,
            events: rx,
        })
    }
}

/// Starting kit for the demo session.
fn demo_world(username: &str) -> SimWorld {
    let world = SimWorld::new(username);
    let mut agent = AgentState::at(Vec3::new(0.5, 64.0, 0.5));
    agent.food = 14.0;
    agent.inventory = vec![
        Item::new("stone_sword", 1, 0),
        Item::new("shield", 1, 1),
        Item::new("bread", 8, 2),
    ];
    world.spawn(agent);
    world.add_rest_spot(Vec3::new(3.5, 64.0, 2.5));
    world.set_instant_travel(true);
    world
}

/// Day/night cycle with a zombie visiting every night.
async fn drive_demo(world: Arc<SimWorld>, events: mpsc::Sender<WorldEvent>) {
    const DAY: Duration = Duration::from_secs(90);
    const NIGHT: Duration = Duration::from_secs(45);
    let zombie = EntityId(1);

    loop {
        tokio::time::sleep(DAY).await;
        world.set_night(true);
        if events.send(WorldEvent::TimeChanged { is_night: true }).await.is_err() {
            return;
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
        world.add_entity(Entity {
            id: zombie,
            kind: EntityKind::Hostile,
            name: "zombie".into(),
            position: Vec3::new(4.0, 64.0, 0.5),
            height: 1.95,
        });
        tokio::time::sleep(Duration::from_secs(3)).await;
        world.remove_entity(zombie);

        tokio::time::sleep(NIGHT).await;
        world.set_night(false);
        if events.send(WorldEvent::TimeChanged { is_night: false }).await.is_err() {
            return;
        }
    }
}
