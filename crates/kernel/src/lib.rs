//! World Kernel: authoritative tile/object state and the change log.
//!
//! # Invariants
//! - Every mutation of an object's position or existence appends exactly one
//!   logical change to the [`ChangeLog`], indexed by the tiles it concerns.
//! - Sequence ids are strictly increasing for the life of the process.
//! - The log is drained once per tick, after every observer was serviced.

pub mod change_log;
pub mod object;
pub mod world;

pub use change_log::{ChangeLog, Diff, DiffKind};
pub use object::{ObjectData, ObjectSnapshot, ObjectSpec, Terrain, Tile, TileSnapshot};
pub use world::{TileRef, World, WorldError};
