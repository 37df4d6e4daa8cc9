//! Lifecycle and environment notifications delivered by the world client.
//!
//! Events arrive on the receiver carried by a [`Connection`](crate::Connection).
//! The session manager is the single consumer.

use serde::{Deserialize, Serialize};

/// All notifications a connection can deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorldEvent {
    /// The agent entered the world. Fired once per session.
    Spawn,

    /// A chat line from any player, including the agent itself.
    Chat { username: String, message: String },

    /// The time-of-day flags changed.
    TimeChanged { is_night: bool },

    /// The server removed the agent. An `End` follows.
    Kicked { reason: String },

    /// A transport-level failure. An `End` usually follows.
    Error { message: String },

    /// The connection closed. Always the last event of a session.
    End { reason: String },
}

impl WorldEvent {
    /// Whether this event terminates the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorldEvent::End { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_end_is_terminal() {
        assert!(WorldEvent::End { reason: "socket closed".into() }.is_terminal());
        assert!(!WorldEvent::Kicked { reason: "afk".into() }.is_terminal());
        assert!(!WorldEvent::Error { message: "ECONNRESET".into() }.is_terminal());
        assert!(!WorldEvent::Spawn.is_terminal());
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = WorldEvent::TimeChanged { is_night: true };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("time_changed"));
        let parsed: WorldEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
