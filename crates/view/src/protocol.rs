//! Server → client messages produced by observer views.
//!
//! Only the logical field set lives here; framing and encoding belong to the
//! transport.

use serde::{Deserialize, Serialize};
use sightline_common::{Coordinate, Direction, ObjectId};
use sightline_kernel::{ObjectSnapshot, TileSnapshot};
use std::ops::{BitOr, BitOrAssign};

/// Which parts of an [`UpdateRecord`] are populated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateOptions(u8);

impl UpdateOptions {
    pub const EMPTY: UpdateOptions = UpdateOptions(0);
    /// The window moved; `origin` and `tiles` are set.
    pub const WINDOW_SHIFT: UpdateOptions = UpdateOptions(1);
    /// The anchor moved; `camera` is set.
    pub const CAMERA_MOVE: UpdateOptions = UpdateOptions(1 << 1);
    /// `diffs` is non-empty.
    pub const DIFFERENCES: UpdateOptions = UpdateOptions(1 << 2);
    /// The controlled object changed; `controllable` is set.
    pub const NEW_CONTROLLABLE: UpdateOptions = UpdateOptions(1 << 3);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: UpdateOptions) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for UpdateOptions {
    type Output = UpdateOptions;

    fn bitor(self, rhs: UpdateOptions) -> UpdateOptions {
        UpdateOptions(self.0 | rhs.0)
    }
}

impl BitOrAssign for UpdateOptions {
    fn bitor_assign(&mut self, rhs: UpdateOptions) {
        self.0 |= rhs.0;
    }
}

/// An observer-local change to a known object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ViewDiff {
    Add {
        snapshot: ObjectSnapshot,
        at: Coordinate,
    },
    Move {
        object: ObjectId,
        direction: Direction,
    },
    Relocate {
        object: ObjectId,
        to: Coordinate,
    },
    Remove {
        object: ObjectId,
    },
}

impl ViewDiff {
    pub fn object(&self) -> ObjectId {
        match self {
            ViewDiff::Add { snapshot, .. } => snapshot.id,
            ViewDiff::Move { object, .. }
            | ViewDiff::Relocate { object, .. }
            | ViewDiff::Remove { object } => *object,
        }
    }
}

/// The object a participant now controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Controllable {
    pub id: ObjectId,
    pub speed: f32,
}

/// One observer's update for one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub options: UpdateOptions,
    /// New anchor, with `CAMERA_MOVE`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<Coordinate>,
    /// New window origin, with `WINDOW_SHIFT`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Coordinate>,
    /// Baseline for every window tile not sent before.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiles: Vec<TileSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diffs: Vec<ViewDiff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controllable: Option<Controllable>,
}

impl UpdateRecord {
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

/// Per-tile overlay value (e.g. a heat or density map).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayInfo {
    pub coord: Coordinate,
    pub value: u32,
}

/// Everything an observer can push to its client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum ServerMessage {
    GraphicsUpdate(UpdateRecord),
    OverlayUpdate(Vec<OverlayInfo>),
    OverlayReset,
}
