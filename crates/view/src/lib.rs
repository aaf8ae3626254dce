//! Observer views: what each participant is allowed to see, and the
//! minimal update that brings their client up to date every tick.
//!
//! # Invariants
//! - `known_visible` holds exactly the objects the client was told about and
//!   not told to forget, each at the position the client last received. An
//!   entry also leaves when the window stops covering that position, or when
//!   a fresh snapshot of that tile omits it.
//! - A relative `Move` is only sent when the client's position for the object
//!   is the move's source; otherwise the new position is sent absolutely.
//! - An object the observer cannot perceive never reaches the client, in a
//!   tile snapshot, a diff or an overlay.
//! - Updates with an empty option mask are never enqueued.

mod emitter;
mod filter;
mod observer;
mod overlay;
mod protocol;
mod synthesis;

pub use emitter::{EmitError, UpdateEmitter, UpdateSink};
pub use filter::VisibilityFilter;
pub use observer::{ObserverView, ViewError, ViewState, ViewStats};
pub use overlay::{CameraOverlay, ObjectDensityOverlay};
pub use protocol::{Controllable, OverlayInfo, ServerMessage, UpdateOptions, UpdateRecord, ViewDiff};
pub use synthesis::{KnownObjects, SynthesisReport};

pub fn crate_info() -> &'static str {
    "sightline-view v0.1.0"
}
