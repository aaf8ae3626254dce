use std::time::Duration;

use serde::{Deserialize, Serialize};
use sightline_common::{AoiConfig, Coordinate};

use crate::error::ServerError;

/// Settings for one game instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    pub aoi: AoiConfig,
    /// Simulation ticks per second.
    pub tick_rate_hz: f32,
    /// World extent in tiles.
    pub world_size: Coordinate,
    /// Milliseconds between object-density overlay refreshes. 0 disables
    /// the overlay.
    pub overlay_period_ms: u64,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            aoi: AoiConfig::default(),
            tick_rate_hz: 20.0,
            world_size: Coordinate::new(64, 64, 3),
            overlay_period_ms: 0,
        }
    }
}

impl InstanceConfig {
    pub fn validate(&self) -> Result<(), ServerError> {
        self.aoi.validate()?;
        if !(self.tick_rate_hz.is_finite() && self.tick_rate_hz > 0.0) {
            return Err(ServerError::InvalidTickRate(self.tick_rate_hz));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        tick_interval(self.tick_rate_hz)
    }

    pub fn overlay_period(&self) -> Option<Duration> {
        (self.overlay_period_ms > 0).then(|| Duration::from_millis(self.overlay_period_ms))
    }
}

/// Time between ticks at `tick_rate_hz`, rounded to whole microseconds.
pub(crate) fn tick_interval(tick_rate_hz: f32) -> Duration {
    let micros = (1_000_000.0 / f64::from(tick_rate_hz)).round().max(1.0);
    Duration::from_micros(micros as u64)
}
