use glam::IVec3;
use sightline_common::{AoiConfig, ConfigError, Coordinate};
use sightline_kernel::{TileRef, World};

/// Errors from building a window.
#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("invalid window config: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to allocate {cells} window cells")]
    Allocation { cells: usize },
}

/// Axis-aligned box of tiles: `origin` inclusive, `origin + extent` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub origin: Coordinate,
    pub extent: IVec3,
}

impl WindowBounds {
    /// Component-wise containment.
    pub fn contains(&self, coord: Coordinate) -> bool {
        let rel = coord - self.origin;
        rel.cmpge(IVec3::ZERO).all() && rel.cmplt(self.extent).all()
    }
}

/// Result of [`SpatialWindow::full_recount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recount {
    Placed,
    /// The anchor coordinate has no tile; the window was left untouched.
    NoAnchor,
}

/// Result of [`SpatialWindow::try_shift`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shift {
    /// The anchor coordinate has no tile; the window was left untouched.
    NoAnchor,
    /// The anchor is still within the padding; nothing moved.
    Unchanged,
    /// The window was never placed, so it was fully recounted.
    Recounted,
    /// The window moved by `delta`. `evicted` lists the synced tiles that
    /// fell outside it.
    Moved { delta: IVec3, evicted: Vec<TileRef> },
}

/// The bounded 3-D box of tiles tracked for one observer.
///
/// Slots are stored x-fastest, then y, then z. A slot is `None` where the
/// world has no tile (past the map edge).
#[derive(Debug)]
pub struct SpatialWindow {
    config: AoiConfig,
    side: i32,
    height: i32,
    anchor: Option<Coordinate>,
    origin: Coordinate,
    cells: Vec<Option<TileRef>>,
    synced: Vec<bool>,
    scratch: Vec<bool>,
    shifted: bool,
}

impl SpatialWindow {
    pub fn new(config: AoiConfig) -> Result<Self, WindowError> {
        config.validate()?;
        let volume = config.volume();

        let mut cells = Vec::new();
        let mut synced = Vec::new();
        let mut scratch = Vec::new();
        cells
            .try_reserve_exact(volume)
            .and_then(|_| synced.try_reserve_exact(volume))
            .and_then(|_| scratch.try_reserve_exact(volume))
            .map_err(|_| WindowError::Allocation { cells: volume })?;
        cells.resize(volume, None);
        synced.resize(volume, false);
        scratch.resize(volume, false);

        Ok(Self {
            config,
            side: config.side(),
            height: config.height(),
            anchor: None,
            origin: Coordinate::default(),
            cells,
            synced,
            scratch,
            shifted: false,
        })
    }

    pub fn config(&self) -> &AoiConfig {
        &self.config
    }

    pub fn anchor(&self) -> Option<Coordinate> {
        self.anchor
    }

    pub fn origin(&self) -> Coordinate {
        self.origin
    }

    pub fn is_placed(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn side(&self) -> i32 {
        self.side
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn volume(&self) -> usize {
        self.cells.len()
    }

    pub fn extent(&self) -> IVec3 {
        IVec3::new(self.side, self.side, self.height)
    }

    pub fn bounds(&self) -> WindowBounds {
        WindowBounds {
            origin: self.origin,
            extent: self.extent(),
        }
    }

    pub fn contains(&self, coord: Coordinate) -> bool {
        self.is_placed() && self.bounds().contains(coord)
    }

    /// Non-empty slots as `(slot, tile, synced)`.
    pub fn cells(&self) -> impl Iterator<Item = (usize, TileRef, bool)> + '_ {
        self.cells
            .iter()
            .zip(&self.synced)
            .enumerate()
            .filter_map(|(i, (cell, synced))| (*cell).map(|tile| (i, tile, *synced)))
    }

    pub fn cell(&self, slot: usize) -> Option<TileRef> {
        self.cells.get(slot).copied().flatten()
    }

    /// Sync flag of a slot. Empty slots count as synced.
    pub fn is_synced(&self, slot: usize) -> bool {
        match self.cells.get(slot) {
            Some(Some(_)) => self.synced[slot],
            _ => true,
        }
    }

    pub fn mark_synced(&mut self, slot: usize) {
        if let Some(flag) = self.synced.get_mut(slot) {
            *flag = true;
        }
    }

    /// Number of non-empty slots already sent to the observer.
    pub fn synced_count(&self) -> usize {
        self.cells().filter(|(_, _, synced)| *synced).count()
    }

    /// Whether the window moved since the last call, clearing the flag.
    pub fn take_shifted(&mut self) -> bool {
        std::mem::take(&mut self.shifted)
    }

    /// Slot of a world coordinate, if the window covers it.
    pub fn slot_of(&self, coord: Coordinate) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        Some(self.flat_index(coord - self.origin))
    }

    /// Re-resolve every slot around `anchor` and clear all sync flags.
    pub fn full_recount(&mut self, world: &World, anchor: Coordinate) -> Recount {
        if world.tile_ref(anchor).is_none() {
            tracing::debug!(%anchor, "full recount skipped: anchor has no tile");
            return Recount::NoAnchor;
        }
        self.place(world, anchor);
        self.synced.fill(false);
        Recount::Placed
    }

    /// True when `anchor` has drifted too close to a face of the window.
    pub fn needs_shift(&self, anchor: Coordinate) -> bool {
        if !self.is_placed() {
            return true;
        }
        let low = anchor - self.origin;
        let high = self.extent() - IVec3::ONE - low;
        let required = self.required_margin();
        low.cmplt(required).any() || high.cmplt(required).any()
    }

    /// Move the window to follow `anchor`, reusing the sync state of every
    /// slot that stays covered.
    pub fn try_shift(&mut self, world: &World, anchor: Coordinate) -> Shift {
        if world.tile_ref(anchor).is_none() {
            tracing::debug!(%anchor, "shift skipped: anchor has no tile");
            return Shift::NoAnchor;
        }
        if !self.is_placed() {
            self.full_recount(world, anchor);
            return Shift::Recounted;
        }
        if !self.needs_shift(anchor) {
            self.anchor = Some(anchor);
            return Shift::Unchanged;
        }

        let _span = tracing::debug_span!("window_shift", %anchor).entered();
        let delta = self.origin_for(anchor) - self.origin;

        self.scratch.fill(false);
        let mut evicted = Vec::new();
        for slot in 0..self.cells.len() {
            if !self.synced[slot] {
                continue;
            }
            let Some(tile) = self.cells[slot] else {
                continue;
            };
            let moved = self.offset_of(slot) - delta;
            if self.in_bounds(moved) {
                let target = self.flat_index(moved);
                self.scratch[target] = true;
            } else {
                evicted.push(tile);
            }
        }

        self.place(world, anchor);
        std::mem::swap(&mut self.synced, &mut self.scratch);

        tracing::debug!(
            dx = delta.x,
            dy = delta.y,
            dz = delta.z,
            evicted = evicted.len(),
            "window shifted"
        );
        Shift::Moved { delta, evicted }
    }

    fn place(&mut self, world: &World, anchor: Coordinate) {
        self.anchor = Some(anchor);
        self.origin = self.origin_for(anchor);
        for slot in 0..self.cells.len() {
            let coord = self.origin + self.offset_of(slot);
            self.cells[slot] = world.tile_ref(coord);
        }
        self.shifted = true;
    }

    fn required_margin(&self) -> IVec3 {
        IVec3::new(self.config.fov / 2, self.config.fov / 2, self.height / 2)
    }

    fn origin_for(&self, anchor: Coordinate) -> Coordinate {
        let half = self.config.fov / 2 + self.config.min_padding;
        anchor - IVec3::new(half, half, self.height / 2)
    }

    fn in_bounds(&self, offset: IVec3) -> bool {
        offset.cmpge(IVec3::ZERO).all() && offset.cmplt(self.extent()).all()
    }

    fn flat_index(&self, offset: IVec3) -> usize {
        ((offset.z * self.side + offset.y) * self.side + offset.x) as usize
    }

    fn offset_of(&self, slot: usize) -> IVec3 {
        let slot = slot as i32;
        let layer = self.side * self.side;
        IVec3::new(slot % self.side, (slot % layer) / self.side, slot / layer)
    }
}
