use serde::{Deserialize, Serialize};
use sightline_common::{Coordinate, ObjectId, VisibilityFlags};

/// Floor type of a tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Space,
    #[default]
    Floor,
    Wall,
}

/// Everything needed to place a new object.
#[derive(Debug, Clone)]
pub struct ObjectSpec {
    pub kind: String,
    pub at: Coordinate,
    pub invisibility: VisibilityFlags,
    pub speed: f32,
}

impl ObjectSpec {
    pub fn new(kind: impl Into<String>, at: Coordinate) -> Self {
        Self {
            kind: kind.into(),
            at,
            invisibility: VisibilityFlags::NONE,
            speed: 4.0,
        }
    }

    pub fn invisible(mut self, flags: VisibilityFlags) -> Self {
        self.invisibility = flags;
        self
    }

    pub fn speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }
}

/// Per-object data stored in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectData {
    pub id: ObjectId,
    pub kind: String,
    pub position: Coordinate,
    pub invisibility: VisibilityFlags,
    /// Movement speed in tiles per second.
    pub speed: f32,
}

impl ObjectData {
    pub fn snapshot(&self) -> ObjectSnapshot {
        ObjectSnapshot {
            id: self.id,
            kind: self.kind.clone(),
            position: self.position,
            speed: self.speed,
        }
    }
}

/// Client-facing object state. Invisibility flags never leave the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    pub id: ObjectId,
    pub kind: String,
    pub position: Coordinate,
    pub speed: f32,
}

/// A single world tile and the objects standing on it.
#[derive(Debug, Clone)]
pub struct Tile {
    coord: Coordinate,
    pub terrain: Terrain,
    content: Vec<ObjectId>,
}

impl Tile {
    pub(crate) fn new(coord: Coordinate, terrain: Terrain) -> Self {
        Self {
            coord,
            terrain,
            content: Vec::new(),
        }
    }

    pub fn coord(&self) -> Coordinate {
        self.coord
    }

    /// Objects on this tile, in arrival order.
    pub fn content(&self) -> &[ObjectId] {
        &self.content
    }

    pub(crate) fn insert(&mut self, id: ObjectId) {
        self.content.push(id);
    }

    pub(crate) fn remove(&mut self, id: ObjectId) -> bool {
        match self.content.iter().position(|o| *o == id) {
            Some(index) => {
                self.content.remove(index);
                true
            }
            None => false,
        }
    }
}

/// Full client-facing state of one tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileSnapshot {
    pub coord: Coordinate,
    pub terrain: Terrain,
    pub objects: Vec<ObjectSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_builder() {
        let spec = ObjectSpec::new("ghost", Coordinate::new(1, 2, 0))
            .invisible(VisibilityFlags(0b10))
            .speed(2.5);
        assert_eq!(spec.kind, "ghost");
        assert_eq!(spec.invisibility, VisibilityFlags(0b10));
        assert_eq!(spec.speed, 2.5);
    }

    #[test]
    fn tile_content_keeps_arrival_order() {
        let mut tile = Tile::new(Coordinate::default(), Terrain::Floor);
        tile.insert(ObjectId(3));
        tile.insert(ObjectId(1));
        tile.insert(ObjectId(2));
        assert!(tile.remove(ObjectId(1)));
        assert!(!tile.remove(ObjectId(1)));
        assert_eq!(tile.content(), &[ObjectId(3), ObjectId(2)]);
    }
}
