//! Streaming: the per-observer spatial window.
//!
//! # Invariants
//! - `cells` and sync flags always hold exactly `side * side * height` slots.
//! - A full recount clears every sync flag.
//! - An incremental shift keeps a sync flag only for slots whose world tile
//!   is still covered; every other synced tile is reported as evicted.

mod window;

pub use window::{Recount, Shift, SpatialWindow, WindowBounds, WindowError};

pub fn crate_info() -> &'static str {
    "sightline-stream v0.1.0"
}
