//! Grid cells and continuous positions.
//!
//! Occupant positions are continuous, measured in grid units where the
//! integer coordinates are cell centres. A position belongs to the cell it
//! rounds to.

use serde::{Deserialize, Serialize};

/// An integer grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Continuous position of this cell's centre.
    pub fn center(self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Chebyshev distance: true when the other cell is one king's move away.
    pub fn is_adjacent(self, other: Self) -> bool {
        let dx = (self.x - other.x).abs();
        let dy = (self.y - other.y).abs();
        dx <= 1 && dy <= 1 && (dx + dy) > 0
    }
}

impl From<(i32, i32)> for GridPos {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// Continuous 2-D vector in grid units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(&self, other: &Self) -> f32 {
        (*other - *self).length()
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self::new(self.x / len, self.y / len)
        } else {
            Self::ZERO
        }
    }

    /// The cell this position lies in.
    pub fn to_cell(&self) -> GridPos {
        GridPos::new(self.x.round() as i32, self.y.round() as i32)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

impl From<GridPos> for Vec2 {
    fn from(cell: GridPos) -> Self {
        cell.center()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_normalize_and_length() {
        let v = Vec2::new(3.0, 4.0);
        assert!((v.length() - 5.0).abs() < 1e-6);
        let n = v.normalize();
        assert!((n.length() - 1.0).abs() < 1e-6);
        assert_eq!(Vec2::ZERO.normalize(), Vec2::ZERO);
    }

    #[test]
    fn to_cell_rounds_to_nearest_centre() {
        assert_eq!(Vec2::new(1.4, 2.6).to_cell(), GridPos::new(1, 3));
        assert_eq!(Vec2::new(-0.4, 0.0).to_cell(), GridPos::new(0, 0));
    }

    #[test]
    fn adjacency_excludes_self() {
        let c = GridPos::new(2, 2);
        assert!(c.is_adjacent(GridPos::new(3, 3)));
        assert!(c.is_adjacent(GridPos::new(2, 1)));
        assert!(!c.is_adjacent(c));
        assert!(!c.is_adjacent(GridPos::new(4, 2)));
    }
}
