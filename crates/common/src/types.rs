use glam::IVec3;
use serde::{Deserialize, Serialize};
use std::ops::{Add, BitOr, BitOrAssign, Sub};
use uuid::Uuid;

/// A tile position in world space.
///
/// Ordering is lexicographic over (x, y, z) so coordinates can key ordered
/// maps. Window containment is a separate, component-wise check.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coordinate {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The neighbouring tile in `direction`.
    pub fn step(self, direction: Direction) -> Self {
        self + direction.offset()
    }
}

impl From<IVec3> for Coordinate {
    fn from(v: IVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Coordinate> for IVec3 {
    fn from(c: Coordinate) -> Self {
        IVec3::new(c.x, c.y, c.z)
    }
}

impl Add<IVec3> for Coordinate {
    type Output = Coordinate;

    fn add(self, rhs: IVec3) -> Coordinate {
        Coordinate::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub<IVec3> for Coordinate {
    type Output = Coordinate;

    fn sub(self, rhs: IVec3) -> Coordinate {
        Coordinate::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Sub for Coordinate {
    type Output = IVec3;

    fn sub(self, rhs: Coordinate) -> IVec3 {
        IVec3::from(self) - IVec3::from(rhs)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Movement direction of a single tile step.
///
/// East is +x, South is +y, Up is +z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
    Up,
    Down,
}

impl Direction {
    /// Every planar direction, in a fixed order.
    pub const PLANAR: [Direction; 8] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::NorthEast,
        Direction::NorthWest,
        Direction::SouthEast,
        Direction::SouthWest,
    ];

    pub fn offset(self) -> IVec3 {
        match self {
            Direction::North => IVec3::new(0, -1, 0),
            Direction::South => IVec3::new(0, 1, 0),
            Direction::East => IVec3::new(1, 0, 0),
            Direction::West => IVec3::new(-1, 0, 0),
            Direction::NorthEast => IVec3::new(1, -1, 0),
            Direction::NorthWest => IVec3::new(-1, -1, 0),
            Direction::SouthEast => IVec3::new(1, 1, 0),
            Direction::SouthWest => IVec3::new(-1, 1, 0),
            Direction::Up => IVec3::new(0, 0, 1),
            Direction::Down => IVec3::new(0, 0, -1),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::NorthEast => Direction::SouthWest,
            Direction::NorthWest => Direction::SouthEast,
            Direction::SouthEast => Direction::NorthWest,
            Direction::SouthWest => Direction::NorthEast,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// Identifier of a world object. Allocated by the world, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a connected participant's observer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObserverId(pub Uuid);

impl ObserverId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.8}", self.0.to_string())
    }
}

/// Capability bitflags.
///
/// Objects carry *invisibility* flags; observers carry *see-invisible*
/// ability flags. An object is perceivable when the ability covers every
/// invisibility bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisibilityFlags(pub u32);

impl VisibilityFlags {
    pub const NONE: VisibilityFlags = VisibilityFlags(0);
    pub const ALL: VisibilityFlags = VisibilityFlags(u32::MAX);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is also set in `self`.
    pub const fn contains(self, other: VisibilityFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for VisibilityFlags {
    type Output = VisibilityFlags;

    fn bitor(self, rhs: VisibilityFlags) -> VisibilityFlags {
        VisibilityFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for VisibilityFlags {
    fn bitor_assign(&mut self, rhs: VisibilityFlags) {
        self.0 |= rhs.0;
    }
}
