use sightline_common::{Coordinate, Direction, ObjectId};
use std::collections::BTreeMap;

use crate::change_log::{ChangeLog, Diff, DiffKind};
use crate::object::{ObjectData, ObjectSpec, Terrain, Tile, TileSnapshot};

/// Errors from world mutations.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum WorldError {
    #[error("world dimensions must be positive, got {0}")]
    InvalidSize(Coordinate),
    #[error("no tile at {0}")]
    OutOfBounds(Coordinate),
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),
}

/// Handle to a tile of one [`World`]. Tiles live as long as the world, so a
/// handle obtained from a world stays valid for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileRef(u32);

impl TileRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The authoritative world: a bounded box of tiles, the objects on them,
/// and the change log of the current tick.
///
/// All mutations go through explicit operations, each of which records the
/// corresponding [`Diff`]. Objects live in a BTreeMap for deterministic
/// iteration.
#[derive(Debug)]
pub struct World {
    size: Coordinate,
    tiles: Vec<Tile>,
    objects: BTreeMap<ObjectId, ObjectData>,
    next_object: u32,
    change_log: ChangeLog,
    tick: u64,
}

impl World {
    /// Create a world of `size.x * size.y * size.z` floor tiles with its
    /// minimal corner at the origin.
    pub fn new(size: Coordinate) -> Result<Self, WorldError> {
        if size.x <= 0 || size.y <= 0 || size.z <= 0 {
            return Err(WorldError::InvalidSize(size));
        }
        let volume = size.x as usize * size.y as usize * size.z as usize;
        let mut tiles = Vec::with_capacity(volume);
        for z in 0..size.z {
            for y in 0..size.y {
                for x in 0..size.x {
                    tiles.push(Tile::new(Coordinate::new(x, y, z), Terrain::Floor));
                }
            }
        }
        Ok(Self {
            size,
            tiles,
            objects: BTreeMap::new(),
            next_object: 1,
            change_log: ChangeLog::new(),
            tick: 0,
        })
    }

    pub fn size(&self) -> Coordinate {
        self.size
    }

    /// Current simulation tick.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Read-only access to all objects, in id order.
    pub fn objects(&self) -> &BTreeMap<ObjectId, ObjectData> {
        &self.objects
    }

    pub fn object(&self, id: ObjectId) -> Option<&ObjectData> {
        self.objects.get(&id)
    }

    pub fn contains(&self, coord: Coordinate) -> bool {
        (0..self.size.x).contains(&coord.x)
            && (0..self.size.y).contains(&coord.y)
            && (0..self.size.z).contains(&coord.z)
    }

    /// Resolve a coordinate to a tile handle. `None` past the map edge.
    pub fn tile_ref(&self, coord: Coordinate) -> Option<TileRef> {
        if !self.contains(coord) {
            return None;
        }
        let (sx, sy) = (self.size.x as usize, self.size.y as usize);
        let index = (coord.z as usize * sy + coord.y as usize) * sx + coord.x as usize;
        Some(TileRef(index as u32))
    }

    pub fn tile(&self, tile: TileRef) -> Option<&Tile> {
        self.tiles.get(tile.index())
    }

    pub fn tile_at(&self, coord: Coordinate) -> Option<&Tile> {
        self.tile_ref(coord).and_then(|r| self.tile(r))
    }

    pub fn set_terrain(&mut self, coord: Coordinate, terrain: Terrain) -> Result<(), WorldError> {
        let tile = self.tile_mut(coord)?;
        tile.terrain = terrain;
        Ok(())
    }

    /// Snapshot a tile, keeping only objects accepted by `keep`.
    pub fn tile_snapshot(
        &self,
        tile: TileRef,
        mut keep: impl FnMut(&ObjectData) -> bool,
    ) -> Option<TileSnapshot> {
        let tile = self.tile(tile)?;
        let objects = tile
            .content()
            .iter()
            .filter_map(|id| self.objects.get(id))
            .filter(|o| keep(o))
            .map(ObjectData::snapshot)
            .collect();
        Some(TileSnapshot {
            coord: tile.coord(),
            terrain: tile.terrain,
            objects,
        })
    }

    /// Diffs recorded for the tile at `coord` since the last drain.
    pub fn pending_diffs(&self, coord: Coordinate) -> impl Iterator<Item = &Diff> + '_ {
        self.change_log.for_tile(coord)
    }

    pub fn change_log(&self) -> &ChangeLog {
        &self.change_log
    }

    /// Drop every retained diff. Called once per tick after all observers
    /// have consumed the log.
    pub fn drain_diffs(&mut self) -> Vec<Diff> {
        self.change_log.drain()
    }

    /// Advance the tick counter.
    pub fn step(&mut self) {
        self.tick += 1;
    }

    /// Place a new object. Records an `Add` on its tile.
    pub fn spawn(&mut self, spec: ObjectSpec) -> Result<ObjectId, WorldError> {
        let at = spec.at;
        self.tile_mut(at)?;

        let id = ObjectId(self.next_object);
        self.next_object += 1;

        let data = ObjectData {
            id,
            kind: spec.kind,
            position: at,
            invisibility: spec.invisibility,
            speed: spec.speed,
        };
        let snapshot = data.snapshot();
        let invisibility = data.invisibility;
        self.objects.insert(id, data);
        self.tile_mut(at)?.insert(id);

        self.change_log
            .record(id, invisibility, DiffKind::Add { at, snapshot }, &[at]);
        tracing::debug!(%id, %at, "object spawned");
        Ok(id)
    }

    /// Step an object one tile. Records a `Move` on both the source and the
    /// destination tile. Returns the new position.
    pub fn move_object(&mut self, id: ObjectId, direction: Direction) -> Result<Coordinate, WorldError> {
        let from = self.object(id).ok_or(WorldError::UnknownObject(id))?.position;
        let to = from.step(direction);
        if !self.contains(to) {
            return Err(WorldError::OutOfBounds(to));
        }

        let invisibility = self.reposition(id, from, to)?;
        self.change_log
            .record(id, invisibility, DiffKind::Move { from, direction }, &[from, to]);
        Ok(to)
    }

    /// Teleport an object. Records a `RelocateAway` on the source tile and a
    /// `Relocate` on the destination tile.
    pub fn relocate(&mut self, id: ObjectId, to: Coordinate) -> Result<(), WorldError> {
        let from = self.object(id).ok_or(WorldError::UnknownObject(id))?.position;
        if !self.contains(to) {
            return Err(WorldError::OutOfBounds(to));
        }
        if from == to {
            return Ok(());
        }

        let invisibility = self.reposition(id, from, to)?;
        self.change_log
            .record(id, invisibility, DiffKind::RelocateAway { to }, &[from]);
        self.change_log
            .record(id, invisibility, DiffKind::Relocate { to }, &[to]);
        tracing::debug!(%id, %from, %to, "object relocated");
        Ok(())
    }

    /// Destroy an object. Records a `Remove` on its tile.
    pub fn remove(&mut self, id: ObjectId) -> Result<ObjectData, WorldError> {
        let data = self.objects.remove(&id).ok_or(WorldError::UnknownObject(id))?;
        let at = data.position;
        if let Ok(tile) = self.tile_mut(at) {
            tile.remove(id);
        }
        self.change_log
            .record(id, data.invisibility, DiffKind::Remove, &[at]);
        tracing::debug!(%id, %at, "object removed");
        Ok(data)
    }

    fn reposition(
        &mut self,
        id: ObjectId,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<sightline_common::VisibilityFlags, WorldError> {
        self.tile_mut(from)?.remove(id);
        self.tile_mut(to)?.insert(id);
        let data = self
            .objects
            .get_mut(&id)
            .ok_or(WorldError::UnknownObject(id))?;
        data.position = to;
        Ok(data.invisibility)
    }

    fn tile_mut(&mut self, coord: Coordinate) -> Result<&mut Tile, WorldError> {
        let tile = self.tile_ref(coord).ok_or(WorldError::OutOfBounds(coord))?;
        self.tiles
            .get_mut(tile.index())
            .ok_or(WorldError::OutOfBounds(coord))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sightline_common::VisibilityFlags;

    fn world() -> World {
        World::new(Coordinate::new(8, 8, 2)).unwrap()
    }

    #[test]
    fn world_starts_empty() {
        let w = world();
        assert_eq!(w.tick(), 0);
        assert_eq!(w.object_count(), 0);
        assert!(w.change_log().is_empty());
    }

    #[test]
    fn rejects_empty_size() {
        assert!(matches!(
            World::new(Coordinate::new(4, 0, 1)),
            Err(WorldError::InvalidSize(_))
        ));
    }

    #[test]
    fn tile_lookup_respects_bounds() {
        let w = world();
        assert!(w.tile_at(Coordinate::new(0, 0, 0)).is_some());
        assert!(w.tile_at(Coordinate::new(7, 7, 1)).is_some());
        assert!(w.tile_at(Coordinate::new(8, 0, 0)).is_none());
        assert!(w.tile_at(Coordinate::new(0, -1, 0)).is_none());
        assert!(w.tile_at(Coordinate::new(0, 0, 2)).is_none());

        let c = Coordinate::new(3, 5, 1);
        assert_eq!(w.tile_at(c).unwrap().coord(), c);
    }

    #[test]
    fn spawn_records_add() {
        let mut w = world();
        let at = Coordinate::new(2, 2, 0);
        let id = w.spawn(ObjectSpec::new("crate", at)).unwrap();

        assert_eq!(w.tile_at(at).unwrap().content(), &[id]);
        let diffs: Vec<_> = w.pending_diffs(at).collect();
        assert_eq!(diffs.len(), 1);
        assert!(matches!(diffs[0].kind, DiffKind::Add { at: a, .. } if a == at));
    }

    #[test]
    fn spawn_out_of_bounds_fails() {
        let mut w = world();
        let err = w.spawn(ObjectSpec::new("crate", Coordinate::new(99, 0, 0)));
        assert_eq!(err, Err(WorldError::OutOfBounds(Coordinate::new(99, 0, 0))));
        assert!(w.change_log().is_empty());
    }

    #[test]
    fn move_updates_content_and_indexes_both_tiles() {
        let mut w = world();
        let from = Coordinate::new(2, 2, 0);
        let id = w.spawn(ObjectSpec::new("mob", from)).unwrap();
        w.drain_diffs();

        let to = w.move_object(id, Direction::East).unwrap();
        assert_eq!(to, Coordinate::new(3, 2, 0));
        assert_eq!(w.object(id).unwrap().position, to);
        assert!(w.tile_at(from).unwrap().content().is_empty());
        assert_eq!(w.tile_at(to).unwrap().content(), &[id]);

        let on_from: Vec<u64> = w.pending_diffs(from).map(|d| d.sequence).collect();
        let on_to: Vec<u64> = w.pending_diffs(to).map(|d| d.sequence).collect();
        assert_eq!(on_from, on_to);
        assert_eq!(on_from.len(), 1);
    }

    #[test]
    fn move_off_the_map_fails() {
        let mut w = world();
        let id = w.spawn(ObjectSpec::new("mob", Coordinate::new(0, 0, 0))).unwrap();
        assert!(w.move_object(id, Direction::West).is_err());
        assert_eq!(w.object(id).unwrap().position, Coordinate::new(0, 0, 0));
    }

    #[test]
    fn relocate_records_away_then_arrival() {
        let mut w = world();
        let from = Coordinate::new(1, 1, 0);
        let to = Coordinate::new(6, 6, 1);
        let id = w.spawn(ObjectSpec::new("mob", from)).unwrap();
        w.drain_diffs();

        w.relocate(id, to).unwrap();
        let away: Vec<_> = w.pending_diffs(from).collect();
        let arrive: Vec<_> = w.pending_diffs(to).collect();
        assert_eq!(away.len(), 1);
        assert_eq!(arrive.len(), 1);
        assert_eq!(away[0].kind, DiffKind::RelocateAway { to });
        assert_eq!(arrive[0].kind, DiffKind::Relocate { to });
        assert!(away[0].sequence < arrive[0].sequence);
    }

    #[test]
    fn relocate_in_place_records_nothing() {
        let mut w = world();
        let at = Coordinate::new(1, 1, 0);
        let id = w.spawn(ObjectSpec::new("mob", at)).unwrap();
        w.drain_diffs();
        w.relocate(id, at).unwrap();
        assert!(w.change_log().is_empty());
    }

    #[test]
    fn remove_keeps_invisibility_on_the_diff() {
        let mut w = world();
        let at = Coordinate::new(4, 4, 0);
        let flags = VisibilityFlags(0b100);
        let id = w
            .spawn(ObjectSpec::new("ghost", at).invisible(flags))
            .unwrap();
        let data = w.remove(id).unwrap();
        assert_eq!(data.kind, "ghost");
        assert!(w.object(id).is_none());

        let last = w.pending_diffs(at).last().unwrap();
        assert_eq!(last.kind, DiffKind::Remove);
        assert_eq!(last.invisibility, flags);
        assert_eq!(w.remove(id), Err(WorldError::UnknownObject(id)));
    }

    #[test]
    fn snapshot_filters_objects() {
        let mut w = world();
        let at = Coordinate::new(4, 4, 0);
        w.spawn(ObjectSpec::new("mob", at)).unwrap();
        w.spawn(ObjectSpec::new("ghost", at).invisible(VisibilityFlags(1)))
            .unwrap();

        let tile = w.tile_ref(at).unwrap();
        let all = w.tile_snapshot(tile, |_| true).unwrap();
        let plain = w
            .tile_snapshot(tile, |o| o.invisibility.is_empty())
            .unwrap();
        assert_eq!(all.objects.len(), 2);
        assert_eq!(plain.objects.len(), 1);
        assert_eq!(plain.objects[0].kind, "mob");
    }

    #[test]
    fn object_ids_are_not_reused() {
        let mut w = world();
        let a = w.spawn(ObjectSpec::new("a", Coordinate::new(0, 0, 0))).unwrap();
        w.remove(a).unwrap();
        let b = w.spawn(ObjectSpec::new("b", Coordinate::new(0, 0, 0))).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn step_increments_tick() {
        let mut w = world();
        w.step();
        w.step();
        assert_eq!(w.tick(), 2);
    }
}
