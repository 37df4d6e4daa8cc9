//! Configuration loading, validation, and management for Steadyhand.
//!
//! Loads configuration from `steadyhand.toml` (or the path in
//! `STEADYHAND_CONFIG`) with environment variable overrides. Every numeric
//! range is validated at startup; a bad range is an error, never clamped.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Duration;

use steadyhand_core::{AuthKind, ConnectOptions, Vec3};

/// The root configuration structure.
///
/// Maps directly to `steadyhand.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log chat lines from other players
    #[serde(default = "default_true")]
    pub chat_log: bool,

    /// Account used to log in
    #[serde(default)]
    pub account: AccountConfig,

    /// Server to connect to
    #[serde(default)]
    pub server: ServerConfig,

    /// Liveness endpoint
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// In-game `/login` after spawn
    #[serde(default)]
    pub auto_auth: AutoAuthConfig,

    /// Threat detection and fighting
    #[serde(default)]
    pub combat: CombatConfig,

    /// Sleeping through the night
    #[serde(default)]
    pub rest: RestConfig,

    /// Idle behavior, confinement, and the humanizer
    #[serde(default)]
    pub behavior: BehaviorConfig,

    /// Periodic chat messages
    #[serde(default)]
    pub chat: ChatConfig,

    /// Automatic eating
    #[serde(default)]
    pub hunger: HungerConfig,

    /// Reconnection policy
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chat_log: true,
            account: AccountConfig::default(),
            server: ServerConfig::default(),
            gateway: GatewayConfig::default(),
            auto_auth: AutoAuthConfig::default(),
            combat: CombatConfig::default(),
            rest: RestConfig::default(),
            behavior: BehaviorConfig::default(),
            chat: ChatConfig::default(),
            hunger: HungerConfig::default(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

// ── Ranges ──────────────────────────────────────────────────────────────────

/// An inclusive `[min, max]` range from the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeConfig<T> {
    pub min: T,
    pub max: T,
}

impl<T> RangeConfig<T> {
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: PartialOrd + Display> RangeConfig<T> {
    /// Reject `min > max`.
    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::ValidationError(format!(
                "{name}: min ({}) must not exceed max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

impl RangeConfig<u64> {
    pub fn as_millis(&self) -> (Duration, Duration) {
        (Duration::from_millis(self.min), Duration::from_millis(self.max))
    }

    pub fn as_secs(&self) -> (Duration, Duration) {
        (Duration::from_secs(self.min), Duration::from_secs(self.max))
    }
}

// ── Connection ──────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default = "default_username")]
    pub username: String,

    /// Overridden by `BOT_PASSWORD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default)]
    pub auth: AuthKind,
}

fn default_username() -> String {
    "Steadyhand".into()
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            password: None,
            auth: AuthKind::default(),
        }
    }
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("auth", &self.auth)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default = "default_check_timeout")]
    pub check_timeout_interval_ms: u64,
}

fn default_server_host() -> String {
    "localhost".into()
}
fn default_server_port() -> u16 {
    25565
}
fn default_check_timeout() -> u64 {
    60_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            version: None,
            check_timeout_interval_ms: default_check_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Overridden by `PORT`
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

fn default_gateway_host() -> String {
    "0.0.0.0".into()
}
fn default_gateway_port() -> u16 {
    3000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AutoAuthConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Overridden by `BOT_PASSWORD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl std::fmt::Debug for AutoAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoAuthConfig")
            .field("enabled", &self.enabled)
            .field("password", &redact(&self.password))
            .finish()
    }
}

// ── Controllers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Hostiles closer than this are engaged
    #[serde(default = "default_kill_radius")]
    pub kill_radius: f64,

    /// At or below this health the agent retreats instead of fighting
    #[serde(default = "default_retreat_health")]
    pub retreat_health: f32,

    #[serde(default = "default_retreat_distance")]
    pub retreat_distance: f64,

    /// Checked in inventory order; first match is equipped
    #[serde(default = "default_preferred_weapons")]
    pub preferred_weapons: Vec<String>,

    #[serde(default = "default_shield_item")]
    pub shield_item: String,

    /// Raise the shield instead of attacking inside this distance
    #[serde(default = "default_block_range")]
    pub block_range: f64,

    /// Delay before the next decision cycle while fighting
    #[serde(default = "default_follow_up_ms")]
    pub follow_up_ms: u64,
}

fn default_kill_radius() -> f64 {
    6.0
}
fn default_retreat_health() -> f32 {
    6.0
}
fn default_retreat_distance() -> f64 {
    8.0
}
fn default_preferred_weapons() -> Vec<String> {
    vec![
        "netherite_sword".into(),
        "diamond_sword".into(),
        "iron_sword".into(),
        "stone_sword".into(),
        "wooden_sword".into(),
    ]
}
fn default_shield_item() -> String {
    "shield".into()
}
fn default_block_range() -> f64 {
    2.5
}
fn default_follow_up_ms() -> u64 {
    400
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kill_radius: default_kill_radius(),
            retreat_health: default_retreat_health(),
            retreat_distance: default_retreat_distance(),
            preferred_weapons: default_preferred_weapons(),
            shield_item: default_shield_item(),
            block_range: default_block_range(),
            follow_up_ms: default_follow_up_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_search_radius")]
    pub search_radius: f64,

    /// How close the navigator should bring the agent to the rest spot
    #[serde(default = "default_approach_distance")]
    pub approach_distance: f64,

    /// Extra tolerance on top of `approach_distance` before resting
    #[serde(default = "default_approach_slack")]
    pub approach_slack: f64,

    /// Rest enforcer tick
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Minimum gap between "no rest spot" notices
    #[serde(default = "default_notice_cooldown_ms")]
    pub notice_cooldown_ms: u64,

    /// Decision-cycle delay while the agent is asleep
    #[serde(default = "default_sleeping_recheck_ms")]
    pub sleeping_recheck_ms: u64,

    /// Treat rain as a reason to rest
    #[serde(default = "default_true")]
    pub rest_in_rain: bool,
}

fn default_search_radius() -> f64 {
    20.0
}
fn default_approach_distance() -> f64 {
    2.0
}
fn default_approach_slack() -> f64 {
    0.5
}
fn default_retry_interval_ms() -> u64 {
    5_000
}
fn default_notice_cooldown_ms() -> u64 {
    60_000
}
fn default_sleeping_recheck_ms() -> u64 {
    10_000
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_radius: default_search_radius(),
            approach_distance: default_approach_distance(),
            approach_slack: default_approach_slack(),
            retry_interval_ms: default_retry_interval_ms(),
            notice_cooldown_ms: default_notice_cooldown_ms(),
            sleeping_recheck_ms: default_sleeping_recheck_ms(),
            rest_in_rain: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Delay between decision cycles
    #[serde(default = "default_reaction_delay")]
    pub reaction_delay_ms: RangeConfig<u64>,

    /// Half-width of the square used for short wanders
    #[serde(default = "default_move_radius")]
    pub move_radius: f64,

    #[serde(default)]
    pub idle_weights: IdleWeights,

    #[serde(default)]
    pub confinement: ConfinementConfig,

    #[serde(default)]
    pub humanizer: HumanizerConfig,
}

fn default_reaction_delay() -> RangeConfig<u64> {
    RangeConfig::new(1_000, 3_999)
}
fn default_move_radius() -> f64 {
    2.0
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reaction_delay_ms: default_reaction_delay(),
            move_radius: default_move_radius(),
            idle_weights: IdleWeights::default(),
            confinement: ConfinementConfig::default(),
            humanizer: HumanizerConfig::default(),
        }
    }
}

/// Relative weights of the idle actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdleWeights {
    pub look: u32,
    pub wander: u32,
    pub nothing: u32,
}

impl Default for IdleWeights {
    fn default() -> Self {
        Self {
            look: 3,
            wander: 1,
            nothing: 6,
        }
    }
}

/// Keeps the agent inside a circle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfinementConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub x: f64,

    #[serde(default)]
    pub y: f64,

    #[serde(default)]
    pub z: f64,

    #[serde(default = "default_confinement_radius")]
    pub radius: f64,
}

fn default_confinement_radius() -> f64 {
    1.5
}

impl ConfinementConfig {
    pub fn center(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

impl Default for ConfinementConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            radius: default_confinement_radius(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanizerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_humanizer_interval")]
    pub interval_secs: RangeConfig<u64>,

    #[serde(default = "default_sneak_hold")]
    pub sneak_hold_ms: RangeConfig<u64>,

    #[serde(default = "default_jump_hold")]
    pub jump_hold_ms: RangeConfig<u64>,

    #[serde(default)]
    pub weights: HumanizerWeights,
}

fn default_humanizer_interval() -> RangeConfig<u64> {
    RangeConfig::new(18, 45)
}
fn default_sneak_hold() -> RangeConfig<u64> {
    RangeConfig::new(300, 1_300)
}
fn default_jump_hold() -> RangeConfig<u64> {
    RangeConfig::new(120, 260)
}

impl Default for HumanizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_humanizer_interval(),
            sneak_hold_ms: default_sneak_hold(),
            jump_hold_ms: default_jump_hold(),
            weights: HumanizerWeights::default(),
        }
    }
}

/// Relative weights of the cosmetic gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanizerWeights {
    pub look: u32,
    pub crouch: u32,
    pub jump: u32,
    pub swing: u32,
}

impl Default for HumanizerWeights {
    fn default() -> Self {
        Self {
            look: 50,
            crouch: 22,
            jump: 16,
            swing: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_chat_delay")]
    pub delay_secs: RangeConfig<u64>,

    /// One is picked uniformly per tick; empty disables the loop
    #[serde(default = "default_chat_messages")]
    pub messages: Vec<String>,
}

fn default_chat_delay() -> RangeConfig<u64> {
    RangeConfig::new(300, 900)
}
fn default_chat_messages() -> Vec<String> {
    vec![
        "hey everyone".into(),
        "anyone need anything?".into(),
        "nice weather today".into(),
    ]
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_secs: default_chat_delay(),
            messages: default_chat_messages(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HungerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_hunger_interval")]
    pub check_interval_ms: u64,

    /// Eat when food drops below this
    #[serde(default = "default_food_threshold")]
    pub food_threshold: f32,

    /// Eat when health drops below this
    #[serde(default = "default_health_threshold")]
    pub health_threshold: f32,

    /// An item is edible when its name contains any of these
    #[serde(default = "default_food_keywords")]
    pub food_keywords: Vec<String>,
}

fn default_hunger_interval() -> u64 {
    10_000
}
fn default_food_threshold() -> f32 {
    16.0
}
fn default_health_threshold() -> f32 {
    15.0
}
fn default_food_keywords() -> Vec<String> {
    vec!["cooked".into(), "bread".into(), "steak".into()]
}

impl Default for HungerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_ms: default_hunger_interval(),
            food_threshold: default_food_threshold(),
            health_threshold: default_health_threshold(),
            food_keywords: default_food_keywords(),
        }
    }
}

/// `delay = base + uniform(0, jitter) + min((failures - 1) * step, max_backoff)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    #[serde(default = "default_jitter")]
    pub jitter_ms: u64,

    #[serde(default = "default_step")]
    pub step_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_base_delay() -> u64 {
    5_000
}
fn default_jitter() -> u64 {
    3_000
}
fn default_step() -> u64 {
    5_000
}
fn default_max_backoff() -> u64 {
    60_000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_delay_ms: default_base_delay(),
            jitter_ms: default_jitter(),
            step_ms: default_step(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Default config file name, looked up in the working directory.
    pub const DEFAULT_FILE: &'static str = "steadyhand.toml";

    /// Load configuration from `STEADYHAND_CONFIG` or `./steadyhand.toml`,
    /// then apply environment overrides:
    /// - `BOT_PASSWORD`: account and auto-auth password
    /// - `PORT`: liveness endpoint port
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::default_path())
    }

    /// Load from a specific path and apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Path used by [`AppConfig::load`].
    pub fn default_path() -> PathBuf {
        std::env::var("STEADYHAND_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(Self::DEFAULT_FILE))
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(password) = lookup("BOT_PASSWORD") {
            self.account.password = Some(password.clone());
            self.auto_auth.password = Some(password);
        }

        if let Some(port) = lookup("PORT") {
            self.gateway.port = port.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("PORT must be a port number, got '{port}'"))
            })?;
        }

        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.behavior
            .reaction_delay_ms
            .validate("behavior.reaction_delay_ms")?;
        self.behavior
            .humanizer
            .interval_secs
            .validate("behavior.humanizer.interval_secs")?;
        self.behavior
            .humanizer
            .sneak_hold_ms
            .validate("behavior.humanizer.sneak_hold_ms")?;
        self.behavior
            .humanizer
            .jump_hold_ms
            .validate("behavior.humanizer.jump_hold_ms")?;
        self.chat.delay_secs.validate("chat.delay_secs")?;

        positive("combat.kill_radius", self.combat.kill_radius)?;
        positive("combat.retreat_distance", self.combat.retreat_distance)?;
        non_negative("combat.block_range", self.combat.block_range)?;
        non_zero("combat.follow_up_ms", self.combat.follow_up_ms)?;

        positive("rest.search_radius", self.rest.search_radius)?;
        non_negative("rest.approach_distance", self.rest.approach_distance)?;
        non_negative("rest.approach_slack", self.rest.approach_slack)?;
        non_zero("rest.retry_interval_ms", self.rest.retry_interval_ms)?;
        non_zero("rest.sleeping_recheck_ms", self.rest.sleeping_recheck_ms)?;

        non_negative("behavior.move_radius", self.behavior.move_radius)?;
        positive("behavior.confinement.radius", self.behavior.confinement.radius)?;
        non_zero("behavior.reaction_delay_ms.max", self.behavior.reaction_delay_ms.max)?;
        non_zero(
            "behavior.humanizer.interval_secs.max",
            self.behavior.humanizer.interval_secs.max,
        )?;

        let idle = self.behavior.idle_weights;
        weight_total("behavior.idle_weights", &[idle.look, idle.wander, idle.nothing])?;
        let human = self.behavior.humanizer.weights;
        weight_total(
            "behavior.humanizer.weights",
            &[human.look, human.crouch, human.jump, human.swing],
        )?;

        non_zero("chat.delay_secs.max", self.chat.delay_secs.max)?;
        non_zero("hunger.check_interval_ms", self.hunger.check_interval_ms)?;

        Ok(())
    }

    /// Connection parameters for the configured account and server.
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            username: self.account.username.clone(),
            password: self.account.password.clone(),
            auth: self.account.auth,
            host: self.server.host.clone(),
            port: self.server.port,
            version: self.server.version.clone(),
            check_timeout_interval: Duration::from_millis(self.server.check_timeout_interval_ms),
        }
    }

    /// Generate a default config TOML string (for `init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(value > 0.0) {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be > 0, got {value}"
        )));
    }
    Ok(())
}

fn non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(value >= 0.0) {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be >= 0, got {value}"
        )));
    }
    Ok(())
}

/// Weights must not all be zero, and their sum must fit in a `u32`.
fn weight_total(name: &str, weights: &[u32]) -> Result<u32, ConfigError> {
    let total = weights
        .iter()
        .try_fold(0u32, |sum, &w| sum.checked_add(w))
        .ok_or_else(|| {
            ConfigError::ValidationError(format!("{name} must sum to at most {}", u32::MAX))
        })?;
    if total == 0 {
        return Err(ConfigError::ValidationError(format!(
            "{name} must not all be zero"
        )));
    }
    Ok(total)
}

fn non_zero(name: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::ValidationError(format!("{name} must be > 0")));
    }
    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
