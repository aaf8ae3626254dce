//! A running game instance: one authoritative world, the participant
//! sessions observing it, and the thread that ticks them.
//!
//! # Invariants
//! - Every tick runs mutation, then observation, then diff release, with no
//!   overlap between phases.
//! - Observers only read the world; they never see a half-applied mutation.
//! - A failing session is dropped without affecting the others.

mod config;
mod error;
mod instance;
mod runner;
mod session;

pub use config::InstanceConfig;
pub use error::ServerError;
pub use instance::{GameInstance, InstanceStats, TickReport};
pub use runner::{InstanceRunner, Mutation};
pub use session::Session;

pub fn crate_info() -> &'static str {
    "sightline-server v0.1.0"
}
