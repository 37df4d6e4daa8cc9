//! # Steadyhand Core
//!
//! Domain types, traits, and error definitions for the Steadyhand agent
//! controller. Beyond serde and tokio's channel types it carries no runtime;
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (the world client, the pathfinder, the
//! connection layer) is defined as a trait here. Implementations live
//! elsewhere. This enables:
//! - Swapping the protocol client without touching behavior code
//! - Deterministic testing against an in-memory world
//! - Clean dependency graph (all crates depend inward on core)

pub mod agent;
pub mod connection;
pub mod error;
pub mod event;
pub mod geometry;
pub mod world;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentState, Entity, EntityId, EntityKind, Environment, EquipSlot, Equipment, Item};
pub use connection::{AuthKind, ConnectOptions, Connection, Connector};
pub use error::{SessionError, WorldError, WorldResult};
pub use event::WorldEvent;
pub use geometry::Vec3;
pub use world::{Control, Goal, MovementProfile, Navigator, World};
