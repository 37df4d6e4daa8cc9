//! Simulated world for Steadyhand.
//!
//! Stands in for the protocol client: a [`SimWorld`] that implements the
//! world and navigator traits in memory, and a [`SimConnector`] that opens
//! scripted sessions. Used by the test suites and by `steadyhand run` when
//! no real client is plugged in.

pub mod connector;
pub mod world;

pub use connector::{ConnectScript, SimConnector, SimSession};
pub use world::{SimWorld, WorldAction};
