//! Map snapshot format and load-time validation.
//!
//! A map is a fixed-size grid of walkable flags plus a list of furniture
//! footprints. It is treated as immutable once loaded; structural changes
//! produce a new snapshot and a full collision rebuild.
//!
//! ```
//! use tilespace_logic::map::{MapSnapshot, FurnitureSpec, FurnitureType, InteractionKind};
//! use tilespace_logic::geometry::GridPos;
//!
//! let mut map = MapSnapshot::open(5, 5);
//! map.furniture.push(FurnitureSpec::new(1, FurnitureType::Chair, GridPos::new(2, 2), 1, 1)
//!     .with_interaction(InteractionKind::Sit));
//! assert!(map.validate().is_empty());
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_MAP_CELLS;
use crate::geometry::{GridPos, Vec2};
use crate::FurnitureId;

/// What a piece of furniture is, used for suggestion filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FurnitureType {
    Chair,
    Desk,
    Computer,
    Bed,
    Sofa,
    Table,
    Bookshelf,
    Cabinet,
    Plant,
    Door,
}

/// How an occupant interacts with a piece of furniture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Sit,
    Sleep,
    Use,
    Examine,
    Open,
}

impl InteractionKind {
    /// Whether the interaction snaps the occupant onto the furniture and
    /// holds it until an explicit stop.
    pub fn is_held(self) -> bool {
        matches!(self, InteractionKind::Sit | InteractionKind::Sleep)
    }
}

/// A furniture footprint as it appears in the map snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurnitureSpec {
    pub id: FurnitureId,
    #[serde(rename = "type")]
    pub furniture_type: FurnitureType,
    /// Top-left covered cell.
    pub origin: GridPos,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub interactive: bool,
    #[serde(default)]
    pub interaction: Option<InteractionKind>,
}

impl FurnitureSpec {
    /// A non-interactive footprint.
    pub fn new(
        id: FurnitureId,
        furniture_type: FurnitureType,
        origin: GridPos,
        width: i32,
        height: i32,
    ) -> Self {
        Self {
            id,
            furniture_type,
            origin,
            width,
            height,
            interactive: false,
            interaction: None,
        }
    }

    /// Mark the footprint interactive with the given behavior.
    pub fn with_interaction(mut self, kind: InteractionKind) -> Self {
        self.interactive = true;
        self.interaction = Some(kind);
        self
    }

    /// Whether the footprint covers `cell`.
    pub fn covers(&self, cell: GridPos) -> bool {
        self.contains_expanded(cell, 0)
    }

    /// Whether `cell` lies within the footprint rectangle grown by `range`
    /// cells on every side.
    pub fn contains_expanded(&self, cell: GridPos, range: i32) -> bool {
        cell.x >= self.origin.x - range
            && cell.x < self.origin.x + self.width + range
            && cell.y >= self.origin.y - range
            && cell.y < self.origin.y + self.height + range
    }

    /// Every cell the footprint covers.
    pub fn cells(&self) -> impl Iterator<Item = GridPos> + '_ {
        (self.origin.y..self.origin.y + self.height).flat_map(move |y| {
            (self.origin.x..self.origin.x + self.width).map(move |x| GridPos::new(x, y))
        })
    }

    /// Centre of the footprint in cell-centre coordinates.
    pub fn centroid(&self) -> Vec2 {
        Vec2::new(
            self.origin.x as f32 + (self.width - 1) as f32 / 2.0,
            self.origin.y as f32 + (self.height - 1) as f32 / 2.0,
        )
    }
}

/// Immutable description of one map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSnapshot {
    pub width: i32,
    pub height: i32,
    /// Row-major walkable flags, `width * height` entries.
    pub walkable: Vec<bool>,
    #[serde(default)]
    pub furniture: Vec<FurnitureSpec>,
}

impl MapSnapshot {
    /// A fully walkable map with no furniture.
    pub fn open(width: i32, height: i32) -> Self {
        let cells = width.max(0) as usize * height.max(0) as usize;
        Self {
            width,
            height,
            walkable: vec![true; cells],
            furniture: Vec::new(),
        }
    }

    /// Build a map from text rows: `#` is a wall, anything else is floor.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len() as i32;
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as i32;
        let mut walkable = Vec::with_capacity(width as usize * height as usize);
        for row in rows {
            let mut count = 0;
            for ch in row.chars() {
                walkable.push(ch != '#');
                count += 1;
            }
            for _ in count..width {
                walkable.push(false);
            }
        }
        Self {
            width,
            height,
            walkable,
            furniture: Vec::new(),
        }
    }

    pub fn in_bounds(&self, cell: GridPos) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    /// Mark a single tile as wall or floor.
    pub fn set_walkable(&mut self, cell: GridPos, walkable: bool) {
        if self.in_bounds(cell) {
            let idx = cell.y as usize * self.width as usize + cell.x as usize;
            if let Some(slot) = self.walkable.get_mut(idx) {
                *slot = walkable;
            }
        }
    }

    /// Check the snapshot for structural defects, returning all found.
    pub fn validate(&self) -> Vec<MapError> {
        let mut errors = Vec::new();

        if self.width <= 0 || self.height <= 0 {
            errors.push(MapError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
            return errors;
        }
        let expected = match self.width.checked_mul(self.height) {
            Some(cells) if cells as usize <= MAX_MAP_CELLS => cells as usize,
            _ => {
                errors.push(MapError::GridTooLarge {
                    width: self.width,
                    height: self.height,
                });
                return errors;
            }
        };
        if self.walkable.len() != expected {
            errors.push(MapError::TileCountMismatch {
                expected,
                found: self.walkable.len(),
            });
        }

        let mut seen = HashSet::new();
        for f in &self.furniture {
            if !seen.insert(f.id) {
                errors.push(MapError::DuplicateFurniture(f.id));
            }
            if f.width <= 0 || f.height <= 0 {
                errors.push(MapError::EmptyFootprint(f.id));
                continue;
            }
            let far = f.origin.offset(f.width - 1, f.height - 1);
            if !self.in_bounds(f.origin) || !self.in_bounds(far) {
                errors.push(MapError::FootprintOutOfBounds(f.id));
            }
            match (f.interactive, f.interaction) {
                (true, None) => errors.push(MapError::MissingInteraction(f.id)),
                (false, Some(_)) => errors.push(MapError::UnexpectedInteraction(f.id)),
                _ => {}
            }
        }

        errors
    }
}

/// A structural defect found while validating a map snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// Width or height is not positive.
    EmptyGrid { width: i32, height: i32 },
    /// `width * height` exceeds `MAX_MAP_CELLS`.
    GridTooLarge { width: i32, height: i32 },
    /// The walkable flag list does not match `width * height`.
    TileCountMismatch { expected: usize, found: usize },
    /// Two footprints share an id.
    DuplicateFurniture(FurnitureId),
    /// Footprint has a non-positive extent.
    EmptyFootprint(FurnitureId),
    /// Footprint extends outside the grid.
    FootprintOutOfBounds(FurnitureId),
    /// Interactive footprint without an interaction kind.
    MissingInteraction(FurnitureId),
    /// Interaction kind set on a non-interactive footprint.
    UnexpectedInteraction(FurnitureId),
}

impl std::fmt::Display for MapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapError::EmptyGrid { width, height } => {
                write!(f, "Map has non-positive dimensions: {}×{}", width, height)
            }
            MapError::GridTooLarge { width, height } => write!(
                f,
                "Map is too large: {}×{} exceeds {} cells",
                width, height, MAX_MAP_CELLS
            ),
            MapError::TileCountMismatch { expected, found } => {
                write!(f, "Expected {} tiles, found {}", expected, found)
            }
            MapError::DuplicateFurniture(id) => write!(f, "Duplicate furniture id #{}", id),
            MapError::EmptyFootprint(id) => write!(f, "Furniture #{} has an empty footprint", id),
            MapError::FootprintOutOfBounds(id) => {
                write!(f, "Furniture #{} extends outside the map", id)
            }
            MapError::MissingInteraction(id) => {
                write!(f, "Interactive furniture #{} has no interaction kind", id)
            }
            MapError::UnexpectedInteraction(id) => {
                write!(f, "Furniture #{} has an interaction but is not interactive", id)
            }
        }
    }
}

impl std::error::Error for MapError {}
