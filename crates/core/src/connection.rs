//! Connector trait: the abstraction over establishing a world session.
//!
//! A Connector knows how to reach a server and hand back a live
//! [`Connection`]: the world handle, the navigator bound to it, and the event
//! stream for that session. One call to [`Connector::connect`] is one session
//! attempt.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::SessionError;
use crate::event::WorldEvent;
use crate::world::{Navigator, World};

/// How the account authenticates against the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    /// No account verification (cracked / LAN servers).
    #[default]
    Offline,
    Microsoft,
}

/// Everything a connector needs to open a session.
#[derive(Clone)]
pub struct ConnectOptions {
    pub username: String,
    pub password: Option<String>,
    pub auth: AuthKind,
    pub host: String,
    pub port: u16,
    /// Protocol version string; `None` lets the client negotiate.
    pub version: Option<String>,
    /// How long the client waits for keep-alives before giving up.
    pub check_timeout_interval: Duration,
}

impl std::fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("username", &self.username)
            .field(
                "password",
                &if self.password.is_some() { "[REDACTED]" } else { "None" },
            )
            .field("auth", &self.auth)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("version", &self.version)
            .field("check_timeout_interval", &self.check_timeout_interval)
            .finish()
    }
}

/// A live session with the world.
pub struct Connection {
    pub world: Arc<dyn World>,
    pub navigator: Arc<dyn Navigator>,
    /// Lifecycle and environment notifications. The stream closing is treated
    /// like an `End` event.
    pub events: mpsc::Receiver<WorldEvent>,
}

/// Opens sessions against a server.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Human-readable connector name (e.g., "sim", "java-protocol").
    fn name(&self) -> &str;

    /// Attempt to open a new session.
    async fn connect(&self, options: &ConnectOptions) -> Result<Connection, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_password() {
        let options = ConnectOptions {
            username: "Steady".into(),
            password: Some("hunter2".into()),
            auth: AuthKind::Offline,
            host: "localhost".into(),
            port: 25565,
            version: None,
            check_timeout_interval: Duration::from_secs(60),
        };
        let debug = format!("{options:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn auth_kind_defaults_to_offline() {
        assert_eq!(AuthKind::default(), AuthKind::Offline);
        let json = serde_json::to_string(&AuthKind::Microsoft).unwrap();
        assert_eq!(json, "\"microsoft\"");
    }
}
