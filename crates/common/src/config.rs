use serde::{Deserialize, Serialize};

/// Errors from validating configuration values.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("field of view must be positive, got {0}")]
    InvalidFov(i32),
    #[error("vertical field of view must be positive, got {0}")]
    InvalidZFov(i32),
    #[error("padding must not be negative, got {0}")]
    NegativePadding(i32),
    #[error("window of fov {fov}, padding {min_padding}, z_fov {z_fov} exceeds {max} cells")]
    WindowTooLarge {
        fov: i32,
        min_padding: i32,
        z_fov: i32,
        max: usize,
    },
}

/// Upper bound on the cells one observer window may cover.
pub const MAX_WINDOW_CELLS: usize = 1 << 24;

/// Area-of-interest window configuration.
///
/// The tracked window is `fov + 2 * min_padding` tiles wide in x and y and
/// `z_fov | 1` tiles tall. The anchor may drift `min_padding` tiles from the
/// window centre in x/y before the window has to shift; any vertical move
/// shifts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AoiConfig {
    /// Visible side length in tiles.
    pub fov: i32,
    /// Extra tiles kept around the visible square on every side.
    pub min_padding: i32,
    /// Visible height in z-levels.
    pub z_fov: i32,
}

impl Default for AoiConfig {
    fn default() -> Self {
        Self {
            fov: 15,
            min_padding: 2,
            z_fov: 3,
        }
    }
}

impl AoiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fov <= 0 {
            return Err(ConfigError::InvalidFov(self.fov));
        }
        if self.z_fov <= 0 {
            return Err(ConfigError::InvalidZFov(self.z_fov));
        }
        if self.min_padding < 0 {
            return Err(ConfigError::NegativePadding(self.min_padding));
        }
        match self.checked_volume() {
            Some(volume) if volume <= MAX_WINDOW_CELLS => Ok(()),
            _ => Err(ConfigError::WindowTooLarge {
                fov: self.fov,
                min_padding: self.min_padding,
                z_fov: self.z_fov,
                max: MAX_WINDOW_CELLS,
            }),
        }
    }

    fn checked_volume(&self) -> Option<usize> {
        let side = self.min_padding.checked_mul(2)?.checked_add(self.fov)?;
        let side = usize::try_from(side).ok()?;
        let height = usize::try_from(self.height()).ok()?;
        side.checked_mul(side)?.checked_mul(height)
    }

    /// Window side length in x and y. Only meaningful for a validated
    /// config.
    pub fn side(&self) -> i32 {
        self.fov + 2 * self.min_padding
    }

    /// Window height in z, always odd so the anchor level sits in the middle.
    pub fn height(&self) -> i32 {
        self.z_fov | 1
    }

    /// Number of cells in the window.
    pub fn volume(&self) -> usize {
        (self.side() as usize) * (self.side() as usize) * (self.height() as usize)
    }
}
