//! Shared types for the sightline engine: tile coordinates, directions,
//! identifiers, visibility flags and the area-of-interest configuration.

mod config;
mod types;

pub use config::{AoiConfig, ConfigError, MAX_WINDOW_CELLS};
pub use types::{Coordinate, Direction, ObjectId, ObserverId, VisibilityFlags};
