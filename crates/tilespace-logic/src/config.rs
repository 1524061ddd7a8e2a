//! Simulation tunables and pointer-to-grid conversion.
//!
//! Everything the engine would otherwise hard-code lives here so several
//! map instances (or tests with accelerated clocks) can run side by side
//! with different settings.
//!
//! ```
//! use tilespace_logic::config::{SimConfig, Viewport};
//! use tilespace_logic::geometry::GridPos;
//!
//! let config = SimConfig::default();
//! assert!(config.validate().is_empty());
//!
//! let viewport = Viewport { tile_size: 32.0, scale: 2.0, offset_x: 0.0, offset_y: 0.0 };
//! assert_eq!(viewport.pointer_to_cell(130.0, 70.0), GridPos::new(2, 1));
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::{
    BRIEF_DURATION, HOVER_RANGE, MAX_SEARCH_EXPANSIONS, NEAREST_WALKABLE_RADIUS,
    PRESENCE_INTERVAL, USE_DURATION, WALK_SPEED,
};
use crate::geometry::GridPos;

/// Screen-to-grid mapping supplied by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Tile edge in unscaled pixels.
    pub tile_size: f32,
    /// Render scale applied on top of `tile_size`.
    pub scale: f32,
    /// Screen position of the map's top-left corner.
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            tile_size: 32.0,
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl Viewport {
    /// Edge of one tile on screen.
    pub fn cell_pixels(&self) -> f32 {
        self.tile_size * self.scale
    }

    /// Convert pointer pixels to the grid cell under the pointer.
    pub fn pointer_to_cell(&self, px: f32, py: f32) -> GridPos {
        let edge = self.cell_pixels();
        GridPos::new(
            ((px - self.offset_x) / edge).floor() as i32,
            ((py - self.offset_y) / edge).floor() as i32,
        )
    }

    /// Screen pixel of a cell's top-left corner.
    pub fn cell_to_pixels(&self, cell: GridPos) -> (f32, f32) {
        let edge = self.cell_pixels();
        (
            self.offset_x + cell.x as f32 * edge,
            self.offset_y + cell.y as f32 * edge,
        )
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Walking speed, grid units per second.
    pub walk_speed: f32,
    /// Ring radius for retargeting an unwalkable destination.
    pub nearest_walkable_radius: i32,
    /// Extra cells around furniture that still count as hovering it.
    pub hover_range: i32,
    /// A* node-expansion cap per query.
    pub max_search_expansions: usize,
    /// Seconds between local presence publications.
    pub presence_interval: f64,
    /// Multiplier on elapsed time (1.0 = real time).
    pub time_scale: f64,
    /// Auto-release delay for `use` interactions, seconds.
    pub use_duration: f64,
    /// Auto-release delay for `examine` / `open` interactions, seconds.
    pub brief_duration: f64,
    pub viewport: Viewport,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            walk_speed: WALK_SPEED,
            nearest_walkable_radius: NEAREST_WALKABLE_RADIUS,
            hover_range: HOVER_RANGE,
            max_search_expansions: MAX_SEARCH_EXPANSIONS,
            presence_interval: PRESENCE_INTERVAL,
            time_scale: 1.0,
            use_duration: USE_DURATION,
            brief_duration: BRIEF_DURATION,
            viewport: Viewport::default(),
        }
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Walking speed must be positive and finite.
    InvalidWalkSpeed(f32),
    /// Search cap of zero would reject every route.
    ZeroSearchCap,
    /// Negative retarget radius or hover range.
    NegativeRadius(i32),
    /// Presence interval must be positive.
    InvalidPresenceInterval(f64),
    /// Time scale must be non-negative.
    InvalidTimeScale(f64),
    /// Interaction durations must be positive.
    InvalidDuration(f64),
    /// Tile size or scale not positive.
    InvalidViewport,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidWalkSpeed(v) => write!(f, "Invalid walk speed: {}", v),
            ConfigError::ZeroSearchCap => write!(f, "Search expansion cap must be non-zero"),
            ConfigError::NegativeRadius(v) => write!(f, "Radius must be non-negative: {}", v),
            ConfigError::InvalidPresenceInterval(v) => {
                write!(f, "Invalid presence interval: {}", v)
            }
            ConfigError::InvalidTimeScale(v) => write!(f, "Invalid time scale: {}", v),
            ConfigError::InvalidDuration(v) => write!(f, "Invalid interaction duration: {}", v),
            ConfigError::InvalidViewport => write!(f, "Viewport tile size and scale must be positive"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl SimConfig {
    /// Validate the configuration, returning all errors found.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if !(self.walk_speed.is_finite() && self.walk_speed > 0.0) {
            errors.push(ConfigError::InvalidWalkSpeed(self.walk_speed));
        }
        if self.max_search_expansions == 0 {
            errors.push(ConfigError::ZeroSearchCap);
        }
        for radius in [self.nearest_walkable_radius, self.hover_range] {
            if radius < 0 {
                errors.push(ConfigError::NegativeRadius(radius));
            }
        }
        if !(self.presence_interval > 0.0) {
            errors.push(ConfigError::InvalidPresenceInterval(self.presence_interval));
        }
        if !(self.time_scale >= 0.0) {
            errors.push(ConfigError::InvalidTimeScale(self.time_scale));
        }
        for duration in [self.use_duration, self.brief_duration] {
            if !(duration > 0.0) {
                errors.push(ConfigError::InvalidDuration(duration));
            }
        }
        if !(self.viewport.tile_size > 0.0 && self.viewport.scale > 0.0) {
            errors.push(ConfigError::InvalidViewport);
        }

        errors
    }
}
