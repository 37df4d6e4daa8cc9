//! Errors reported by the world interface and the connection layer.
//!
//! A `WorldError` is logged and the session carries on. A `SessionError`
//! explains why a session could not start or had to end.

use thiserror::Error;

/// Result of a single request against the world interface.
pub type WorldResult<T> = std::result::Result<T, WorldError>;

/// A request to the world interface was not carried out.
///
/// Every variant is recoverable: callers log it and carry on with the next
/// cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("Agent has not spawned yet")]
    NotSpawned,

    #[error("Request '{action}' rejected: {reason}")]
    Rejected { action: String, reason: String },

    #[error("Target unreachable: {0}")]
    Unreachable(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("World connection lost: {0}")]
    Disconnected(String),
}

impl WorldError {
    /// Shorthand for a rejected request.
    pub fn rejected(action: impl Into<String>, reason: impl Into<String>) -> Self {
        WorldError::Rejected {
            action: action.into(),
            reason: reason.into(),
        }
    }
}

/// Failures that end a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Connection to {host}:{port} failed: {reason}")]
    ConnectFailed {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("Kicked from server: {0}")]
    Kicked(String),

    #[error("Transport error: {0}")]
    Transport(String),
}
