use serde::{Deserialize, Serialize};
use sightline_common::{Coordinate, Direction, ObjectId, VisibilityFlags};
use std::collections::HashMap;

use crate::object::ObjectSnapshot;

/// What happened to an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiffKind {
    /// Object appeared on tile `at`.
    Add { at: Coordinate, snapshot: ObjectSnapshot },
    /// Object stepped one tile from `from` towards `direction`.
    Move { from: Coordinate, direction: Direction },
    /// Object jumped to `to`. Indexed on the destination tile.
    Relocate { to: Coordinate },
    /// Object left for `to`. Indexed on the source tile.
    RelocateAway { to: Coordinate },
    /// Object was destroyed.
    Remove,
}

impl DiffKind {
    pub fn name(&self) -> &'static str {
        match self {
            DiffKind::Add { .. } => "add",
            DiffKind::Move { .. } => "move",
            DiffKind::Relocate { .. } => "relocate",
            DiffKind::RelocateAway { .. } => "relocate_away",
            DiffKind::Remove => "remove",
        }
    }
}

/// A single recorded world change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    /// Global, strictly increasing. Only meaningful for ordering.
    pub sequence: u64,
    pub object: ObjectId,
    /// Invisibility of the object when the change was recorded, so the diff
    /// can be filtered after the object is gone.
    pub invisibility: VisibilityFlags,
    pub kind: DiffKind,
}

/// Append-only log of diffs for the current tick, indexed by tile.
#[derive(Debug, Default)]
pub struct ChangeLog {
    next_sequence: u64,
    entries: Vec<Diff>,
    by_tile: HashMap<Coordinate, Vec<usize>>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diff and index it under every tile in `tiles`.
    /// Returns the assigned sequence id.
    pub fn record(
        &mut self,
        object: ObjectId,
        invisibility: VisibilityFlags,
        kind: DiffKind,
        tiles: &[Coordinate],
    ) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let index = self.entries.len();
        tracing::trace!(sequence, %object, kind = kind.name(), "diff recorded");
        self.entries.push(Diff {
            sequence,
            object,
            invisibility,
            kind,
        });

        for (i, tile) in tiles.iter().enumerate() {
            if tiles[..i].contains(tile) {
                continue;
            }
            self.by_tile.entry(*tile).or_default().push(index);
        }
        sequence
    }

    /// Diffs concerning `tile` since the last drain, in append order.
    pub fn for_tile(&self, tile: Coordinate) -> impl Iterator<Item = &Diff> + '_ {
        self.by_tile
            .get(&tile)
            .into_iter()
            .flatten()
            .map(move |&i| &self.entries[i])
    }

    /// Every diff since the last drain, in append order.
    pub fn entries(&self) -> &[Diff] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sequence id the next diff will get.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Remove and return every retained diff. Sequence ids keep counting.
    pub fn drain(&mut self) -> Vec<Diff> {
        self.by_tile.clear();
        std::mem::take(&mut self.entries)
    }
}
