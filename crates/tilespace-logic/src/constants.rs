//! Shared constants for movement and interaction timing.

/// Reference walking speed in grid units per second.
pub const WALK_SPEED: f32 = 3.0;

/// Seconds a `use` interaction holds its furniture before auto-release.
pub const USE_DURATION: f64 = 3.0;

/// Seconds an `examine` or `open` interaction holds its furniture.
pub const BRIEF_DURATION: f64 = 2.0;

/// Ring radius searched when retargeting an unwalkable destination.
pub const NEAREST_WALKABLE_RADIUS: i32 = 5;

/// Extra cells around a footprint that still count as hovering it.
pub const HOVER_RANGE: i32 = 0;

/// Largest grid, in cells, a map may declare.
pub const MAX_MAP_CELLS: usize = 1 << 24;

/// Upper bound on A* node expansions for a single query.
pub const MAX_SEARCH_EXPANSIONS: usize = 10_000;

/// Seconds between presence publications of the local occupant.
pub const PRESENCE_INTERVAL: f64 = 1.0;

/// Distance under which a glide counts as arrived.
pub const ARRIVAL_EPSILON: f32 = 1e-4;
