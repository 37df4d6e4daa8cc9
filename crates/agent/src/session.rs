//! Connection lifecycle and reconnects.
//!
//! The manager connects, waits for the agent to spawn, starts the session
//! tasks, and tears them down again when the session ends. After every end it
//! counts a failure and reconnects after a growing, jittered delay. The
//! failure count only goes back to zero once a later session actually spawns,
//! so a server that accepts and immediately kicks still backs off.

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use steadyhand_config::{AppConfig, ConfigError};
use steadyhand_core::{
    Connection, Connector, MovementProfile, Navigator, SessionError, World, WorldEvent,
};
use steadyhand_workflow::TaskSet;

use crate::backoff::{Backoff, ReconnectState};
use crate::chat;
use crate::context::SessionContext;
use crate::tasks::{self, Controllers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Published after every state change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    /// Whether the agent has spawned in the current session.
    pub spawned: bool,
    pub consecutive_failures: u32,
    pub sessions_started: u64,
    pub last_spawn_at: Option<DateTime<Utc>>,
    /// Set while waiting to reconnect.
    pub reconnect_in_ms: Option<u64>,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEnd {
    ConnectFailed(SessionError),
    Closed {
        reason: String,
        kicked: Option<String>,
        spawned: bool,
    },
}

pub struct SessionManager {
    connector: Arc<dyn Connector>,
    config: Arc<AppConfig>,
    controllers: Arc<Controllers>,
    reconnect: Arc<ReconnectState>,
    backoff: Backoff,
    status: watch::Sender<SessionStatus>,
    rng: Mutex<StdRng>,
    seed: Option<u64>,
}

impl SessionManager {
    pub fn new(connector: Arc<dyn Connector>, config: AppConfig) -> Result<Self, ConfigError> {
        let controllers = Arc::new(Controllers::from_config(&config)?);
        let (status, _) = watch::channel(SessionStatus::default());
        Ok(Self {
            connector,
            backoff: Backoff::from_config(&config.reconnect),
            config: Arc::new(config),
            controllers,
            reconnect: Arc::new(ReconnectState::new()),
            status,
            rng: Mutex::new(StdRng::from_os_rng()),
            seed: None,
        })
    }

    /// Make every random draw reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self.seed = Some(seed);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn reconnect_state(&self) -> Arc<ReconnectState> {
        self.reconnect.clone()
    }

    /// Run sessions back to back until `shutdown` resolves. Dropping the
    /// running session cancels its tasks.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> Option<SessionEnd> {
        tokio::select! {
            end = self.run() => Some(end),
            () = shutdown => {
                info!("Shutting down session manager");
                None
            }
        }
    }

    /// Run sessions back to back. Returns only when reconnecting is
    /// disabled, with the end of the last session.
    pub async fn run(&self) -> SessionEnd {
        loop {
            let end = self.run_session().await;
            let failures = self.reconnect.record_failure();

            if !self.config.reconnect.enabled {
                info!(?end, "Session ended, reconnect disabled");
                self.publish(|s| s.consecutive_failures = failures);
                return end;
            }

            let delay = {
                let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
                self.backoff.delay(failures, &mut *rng)
            };
            info!(
                failures,
                delay_secs = delay.as_secs_f64(),
                "Reconnecting in {:.1}s",
                delay.as_secs_f64()
            );
            self.publish(|s| {
                s.consecutive_failures = failures;
                s.reconnect_in_ms = Some(delay.as_millis() as u64);
            });
            tokio::time::sleep(delay).await;
        }
    }

    /// One connect-to-end session.
    pub async fn run_session(&self) -> SessionEnd {
        self.publish(|s| {
            s.state = SessionState::Connecting;
            s.spawned = false;
            s.reconnect_in_ms = None;
        });

        let options = self.config.connect_options();
        info!(
            connector = self.connector.name(),
            host = %options.host,
            port = options.port,
            username = %options.username,
            "Connecting"
        );
        let connection = match self.connector.connect(&options).await {
            Ok(connection) => connection,
            Err(e) => {
                error!(error = %e, "Connection failed");
                self.publish(|s| s.state = SessionState::Disconnected);
                return SessionEnd::ConnectFailed(e);
            }
        };
        self.publish(|s| s.state = SessionState::Connected);

        let end = self.drive(connection).await;
        self.publish(|s| {
            s.state = SessionState::Disconnected;
            s.spawned = false;
        });
        end
    }

    async fn drive(&self, connection: Connection) -> SessionEnd {
        let Connection {
            world,
            navigator,
            mut events,
        } = connection;

        let mut running = TaskSet::new();
        let mut ctx: Option<Arc<SessionContext>> = None;
        let mut kicked = None;

        let reason = loop {
            let Some(event) = events.recv().await else {
                break "event stream closed".to_string();
            };
            match event {
                WorldEvent::Spawn => {
                    if ctx.is_some() {
                        debug!("Respawned");
                        continue;
                    }
                    let session = Arc::new(self.new_context(world.clone(), navigator.clone()));
                    running = self.on_spawn(&session);
                    ctx = Some(session);
                }
                WorldEvent::Chat { username, message } => {
                    if self.config.chat_log && chat::should_log(world.username(), &username) {
                        info!("<{username}> {message}");
                    }
                }
                WorldEvent::TimeChanged { is_night } => {
                    debug!(is_night, "Time changed");
                    if let (true, Some(session)) = (is_night, &ctx) {
                        running.prune_finished();
                        running.push(tasks::rest_now(session, &self.controllers));
                    }
                }
                WorldEvent::Kicked { reason } => {
                    warn!(%reason, "Kicked from server");
                    kicked = Some(reason);
                }
                WorldEvent::Error { message } => {
                    error!(%message, "Connection error");
                }
                WorldEvent::End { reason } => break reason,
            }
        };

        let cancelled = running.cancel_all();
        info!(%reason, cancelled, "Session ended");

        SessionEnd::Closed {
            reason,
            kicked,
            spawned: ctx.is_some(),
        }
    }

    fn on_spawn(&self, session: &Arc<SessionContext>) -> TaskSet {
        self.reconnect.reset();
        session.navigator.set_profile(MovementProfile::safe());
        info!(username = %session.world.username(), "Spawned");

        self.publish(|s| {
            s.spawned = true;
            s.consecutive_failures = 0;
            s.sessions_started += 1;
            s.last_spawn_at = Some(Utc::now());
        });

        tasks::spawn_session_tasks(session, &self.controllers)
    }

    fn new_context(&self, world: Arc<dyn World>, navigator: Arc<dyn Navigator>) -> SessionContext {
        let ctx = SessionContext::new(world, navigator, self.config.clone());
        match self.seed {
            Some(seed) => {
                let started = self.status.borrow().sessions_started;
                ctx.with_seed(seed.wrapping_add(started))
            }
            None => ctx,
        }
    }

    fn publish(&self, update: impl FnOnce(&mut SessionStatus)) {
        self.status.send_modify(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use steadyhand_core::{Vec3, World as _};
    use steadyhand_sim::{ConnectScript, SimConnector, SimWorld};

    fn quick_reconnect() -> AppConfig {
        let mut config = AppConfig::default();
        config.reconnect.base_delay_ms = 1_000;
        config.reconnect.jitter_ms = 0;
        config.reconnect.step_ms = 1_000;
        config.reconnect.max_backoff_ms = 5_000;
        config.behavior.humanizer.enabled = false;
        config
    }

    fn manager(connector: &Arc<SimConnector>, config: AppConfig) -> SessionManager {
        SessionManager::new(connector.clone(), config)
            .unwrap()
            .with_seed(11)
    }

    fn refuse() -> ConnectScript {
        ConnectScript::Refuse("ECONNREFUSED".into())
    }

    fn kicked_before_spawn(world: Arc<SimWorld>) -> ConnectScript {
        ConnectScript::Accept {
            world,
            events: vec![
                (
                    Duration::from_millis(10),
                    WorldEvent::Kicked {
                        reason: "banned".into(),
                    },
                ),
                (
                    Duration::from_millis(20),
                    WorldEvent::End {
                        reason: "kicked".into(),
                    },
                ),
            ],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_connects_back_off_further_each_time() {
        let connector = Arc::new(SimConnector::new(vec![]));
        let manager = manager(&connector, quick_reconnect());
        let reconnect = manager.reconnect_state();

        // Attempts at 0s, 1s, 3s, 6s, 10s.
        manager
            .run_until(tokio::time::sleep(Duration::from_millis(6_500)))
            .await;
        assert_eq!(connector.attempts(), 4);
        assert_eq!(reconnect.failures(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_resets_failure_count() {
        let world = Arc::new(SimWorld::spawned_at("bot", Vec3::ZERO));
        let connector = Arc::new(SimConnector::new(vec![
            refuse(),
            refuse(),
            ConnectScript::Accept {
                world: world.clone(),
                events: vec![(Duration::from_millis(100), WorldEvent::Spawn)],
            },
        ]));
        let manager = manager(&connector, quick_reconnect());
        let status = manager.subscribe();
        let reconnect = manager.reconnect_state();

        manager
            .run_until(tokio::time::sleep(Duration::from_secs(4)))
            .await;

        assert_eq!(connector.attempts(), 3);
        assert_eq!(reconnect.failures(), 0);
        let status = status.borrow().clone();
        assert_eq!(status.state, SessionState::Connected);
        assert!(status.spawned);
        assert_eq!(status.sessions_started, 1);
        assert!(status.last_spawn_at.is_some());
        assert_eq!(world.profile(), Some(MovementProfile::safe()));
    }

    #[tokio::test(start_paused = true)]
    async fn kicked_sessions_keep_escalating() {
        let connector = Arc::new(SimConnector::new(vec![
            kicked_before_spawn(Arc::new(SimWorld::new("bot"))),
            kicked_before_spawn(Arc::new(SimWorld::new("bot"))),
            kicked_before_spawn(Arc::new(SimWorld::new("bot"))),
        ]));
        let mut config = quick_reconnect();
        config.reconnect.enabled = false;
        let manager = manager(&connector, config);
        let reconnect = manager.reconnect_state();

        for expected in 1..=3 {
            let end = manager.run().await;
            assert_eq!(
                end,
                SessionEnd::Closed {
                    reason: "kicked".into(),
                    kicked: Some("banned".into()),
                    spawned: false,
                }
            );
            assert_eq!(reconnect.failures(), expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_reconnect_returns_after_first_end() {
        let connector = Arc::new(SimConnector::new(vec![refuse()]));
        let mut config = quick_reconnect();
        config.reconnect.enabled = false;
        let manager = manager(&connector, config);

        let end = manager.run().await;
        assert!(matches!(end, SessionEnd::ConnectFailed(_)));
        assert_eq!(connector.attempts(), 1);
        assert_eq!(manager.subscribe().borrow().state, SessionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn session_end_cancels_all_tasks() {
        let world = Arc::new(SimWorld::spawned_at("bot", Vec3::ZERO));
        let connector = Arc::new(SimConnector::new(vec![ConnectScript::Accept {
            world: world.clone(),
            events: vec![
                (Duration::ZERO, WorldEvent::Spawn),
                (
                    Duration::from_secs(30),
                    WorldEvent::End {
                        reason: "server closed".into(),
                    },
                ),
            ],
        }]));
        let mut config = quick_reconnect();
        config.reconnect.enabled = false;
        let manager = manager(&connector, config);

        let end = manager.run().await;
        assert!(matches!(end, SessionEnd::Closed { spawned: true, .. }));
        tokio::task::yield_now().await;

        world.take_actions();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(world.actions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn nightfall_triggers_a_rest_attempt() {
        let world = Arc::new(SimWorld::spawned_at("bot", Vec3::ZERO));
        world.add_rest_spot(Vec3::new(1.0, 0.0, 0.0));
        let connector = Arc::new(SimConnector::new(vec![ConnectScript::spawn_and_stay(
            world.clone(),
        )]));
        let manager = manager(&connector, quick_reconnect());

        let night = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            world.set_night(true);
            let sessions = connector.sessions();
            sessions[0]
                .events
                .send(WorldEvent::TimeChanged { is_night: true })
                .await
                .unwrap();
            // Well before the rest enforcer's first tick.
            tokio::time::sleep(Duration::from_millis(100)).await;
        };
        manager.run_until(night).await;

        assert_eq!(world.count("sleep"), 1);
        assert!(world.state().unwrap().is_sleeping);
    }

    #[tokio::test(start_paused = true)]
    async fn error_event_does_not_end_session() {
        let world = Arc::new(SimWorld::spawned_at("bot", Vec3::ZERO));
        let connector = Arc::new(SimConnector::new(vec![ConnectScript::Accept {
            world,
            events: vec![
                (Duration::ZERO, WorldEvent::Spawn),
                (
                    Duration::from_millis(50),
                    WorldEvent::Error {
                        message: "ECONNRESET".into(),
                    },
                ),
            ],
        }]));
        let manager = manager(&connector, quick_reconnect());
        let status = manager.subscribe();

        manager
            .run_until(tokio::time::sleep(Duration::from_secs(2)))
            .await;
        assert_eq!(connector.attempts(), 1);
        assert_eq!(status.borrow().state, SessionState::Connected);
    }

    #[test]
    fn status_serializes_for_health_endpoint() {
        let status = SessionStatus {
            state: SessionState::Connected,
            spawned: true,
            consecutive_failures: 0,
            sessions_started: 2,
            last_spawn_at: None,
            reconnect_in_ms: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "connected");
        assert_eq!(json["sessions_started"], 2);
    }
}
