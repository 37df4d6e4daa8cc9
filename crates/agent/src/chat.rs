//! Outgoing chat: the occasional canned message and the auto-auth login.

use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

use steadyhand_config::{AutoAuthConfig, ChatConfig};
use steadyhand_workflow::DelayRange;

use crate::context::SessionContext;

/// How long after spawn the login command goes out.
pub const LOGIN_DELAY: Duration = Duration::from_secs(3);

pub struct ChatScheduler {
    delay: DelayRange,
    messages: Vec<String>,
}

impl ChatScheduler {
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            delay: DelayRange::from_secs(&config.delay_secs),
            messages: config.messages.clone(),
        }
    }

    pub fn delay(&self) -> &DelayRange {
        &self.delay
    }

    /// Nothing to say means nothing to schedule.
    pub fn has_messages(&self) -> bool {
        !self.messages.is_empty()
    }

    /// Send one randomly chosen message. Returns what was sent.
    pub async fn tick(&self, ctx: &SessionContext) -> Option<String> {
        if self.messages.is_empty() || ctx.world.state().is_none() {
            return None;
        }
        let index = ctx.with_rng(|rng| rng.random_range(0..self.messages.len()));
        let message = &self.messages[index];
        match ctx.world.chat(message).await {
            Ok(()) => {
                info!(message = %message, "Sent chat message");
                Some(message.clone())
            }
            Err(e) => {
                warn!(error = %e, "Chat message not sent");
                None
            }
        }
    }
}

/// The login command for servers with an auth plugin, if auto-auth is on
/// and a password is configured.
pub fn login_command(config: &AutoAuthConfig) -> Option<String> {
    if !config.enabled {
        return None;
    }
    match config.password.as_deref() {
        Some(password) if !password.is_empty() => Some(format!("/login {password}")),
        _ => {
            warn!("Auto-auth enabled but no password configured");
            None
        }
    }
}

pub async fn send_login(ctx: &SessionContext, command: &str) {
    match ctx.world.chat(command).await {
        Ok(()) => info!("Sent login command"),
        Err(e) => warn!(error = %e, "Login command not sent"),
    }
}

/// Whether an incoming chat line belongs in the chat log.
pub fn should_log(own_username: &str, sender: &str) -> bool {
    sender != own_username
}
