use std::time::Duration;

use sightline_kernel::{Tile, World};

use crate::filter::VisibilityFilter;
use crate::protocol::OverlayInfo;

/// Periodic per-tile information drawn over the observer's window.
pub trait CameraOverlay: Send {
    /// Advance the overlay's clock by `elapsed`. Returns true when a refresh
    /// is due.
    fn is_due(&mut self, elapsed: Duration) -> bool;

    /// Overlay value for one window tile. Must only account for objects
    /// `filter` permits.
    fn info(&self, world: &World, tile: &Tile, filter: &VisibilityFilter) -> OverlayInfo;
}

/// Number of perceivable objects per tile, refreshed every `period`.
#[derive(Debug, Clone)]
pub struct ObjectDensityOverlay {
    period: Duration,
    accumulated: Duration,
}

impl ObjectDensityOverlay {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            accumulated: Duration::ZERO,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl CameraOverlay for ObjectDensityOverlay {
    fn is_due(&mut self, elapsed: Duration) -> bool {
        self.accumulated += elapsed;
        if self.accumulated < self.period {
            return false;
        }
        self.accumulated = Duration::ZERO;
        true
    }

    fn info(&self, world: &World, tile: &Tile, filter: &VisibilityFilter) -> OverlayInfo {
        let value = tile
            .content()
            .iter()
            .filter_map(|id| world.object(*id))
            .filter(|o| filter.permits_object(o))
            .count();
        OverlayInfo {
            coord: tile.coord(),
            value: u32::try_from(value).unwrap_or(u32::MAX),
        }
    }
}
