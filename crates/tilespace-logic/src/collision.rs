//! Walkability grid derived from map tiles and furniture footprints.
//!
//! `CollisionIndex` is built once per map snapshot. Every cell under a
//! footprint is solid regardless of whether the furniture is interactive or
//! occupied. The only way to change the grid is to rebuild it.

use std::collections::HashMap;

use crate::geometry::GridPos;
use crate::map::{FurnitureSpec, MapSnapshot};
use crate::FurnitureId;

/// Pre-built walkability grid plus the furniture it was built from.
#[derive(Debug, Clone)]
pub struct CollisionIndex {
    width: i32,
    height: i32,
    /// Row-major, `width * height`.
    walkable: Vec<bool>,
    furniture: Vec<FurnitureSpec>,
    /// furniture id → index into `furniture`
    by_id: HashMap<FurnitureId, usize>,
}

impl CollisionIndex {
    /// Build the grid: tile flags first, then footprints stamped solid.
    /// Footprint cells outside the map are ignored; missing tile flags
    /// count as walls.
    pub fn build(map: &MapSnapshot) -> Self {
        let width = map.width.max(0);
        let height = map.height.max(0);
        let cells = width as usize * height as usize;

        let mut walkable = vec![false; cells];
        for (slot, &flag) in walkable.iter_mut().zip(map.walkable.iter()) {
            *slot = flag;
        }

        let mut by_id = HashMap::with_capacity(map.furniture.len());
        for (i, f) in map.furniture.iter().enumerate() {
            by_id.entry(f.id).or_insert(i);
            for cell in f.cells() {
                if cell.x >= 0 && cell.y >= 0 && cell.x < width && cell.y < height {
                    walkable[cell.y as usize * width as usize + cell.x as usize] = false;
                }
            }
        }

        Self {
            width,
            height,
            walkable,
            furniture: map.furniture.clone(),
            by_id,
        }
    }

    /// Replace the whole grid from a new snapshot.
    pub fn rebuild(&mut self, map: &MapSnapshot) {
        *self = Self::build(map);
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, cell: GridPos) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    /// Bounds check, then grid lookup.
    pub fn is_walkable(&self, cell: GridPos) -> bool {
        self.in_bounds(cell) && self.walkable[cell.y as usize * self.width as usize + cell.x as usize]
    }

    /// Whether a single king's-move step is legal.
    ///
    /// Diagonal steps also need one of the two orthogonal neighbours open,
    /// so an occupant never squeezes between two solid corners.
    pub fn can_step(&self, from: GridPos, to: GridPos) -> bool {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        if dx.abs() > 1 || dy.abs() > 1 {
            return false;
        }
        if !self.is_walkable(to) {
            return false;
        }
        if dx != 0 && dy != 0 {
            let beside_x = GridPos::new(from.x + dx, from.y);
            let beside_y = GridPos::new(from.x, from.y + dy);
            return self.is_walkable(beside_x) || self.is_walkable(beside_y);
        }
        true
    }

    /// First walkable cell on the smallest ring around `cell`, scanning each
    /// ring row by row. Radius 0 (the cell itself) is not considered.
    pub fn find_nearest_walkable(&self, cell: GridPos, max_radius: i32) -> Option<GridPos> {
        for radius in 1..=max_radius {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs() != radius && dy.abs() != radius {
                        continue;
                    }
                    let candidate = cell.offset(dx, dy);
                    if self.is_walkable(candidate) {
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }

    /// Interactive furniture whose footprint, grown by `range`, contains `cell`.
    pub fn nearby_interactive(&self, cell: GridPos, range: i32) -> Vec<&FurnitureSpec> {
        self.furniture
            .iter()
            .filter(|f| f.interactive && f.contains_expanded(cell, range))
            .collect()
    }

    /// The footprint covering `cell`, if any.
    pub fn furniture_at(&self, cell: GridPos) -> Option<&FurnitureSpec> {
        self.furniture.iter().find(|f| f.covers(cell))
    }

    pub fn furniture(&self, id: FurnitureId) -> Option<&FurnitureSpec> {
        self.by_id.get(&id).map(|&i| &self.furniture[i])
    }

    pub fn furniture_iter(&self) -> impl Iterator<Item = &FurnitureSpec> {
        self.furniture.iter()
    }

    /// Walkable cells bordering a footprint (its rectangle grown by one).
    pub fn approach_cells(&self, furniture: &FurnitureSpec) -> Vec<GridPos> {
        let o = furniture.origin;
        let mut cells = Vec::new();
        for y in (o.y - 1)..=(o.y + furniture.height) {
            for x in (o.x - 1)..=(o.x + furniture.width) {
                let cell = GridPos::new(x, y);
                if !furniture.covers(cell) && self.is_walkable(cell) {
                    cells.push(cell);
                }
            }
        }
        cells
    }

    /// Number of walkable cells.
    pub fn walkable_count(&self) -> usize {
        self.walkable.iter().filter(|&&w| w).count()
    }
}
