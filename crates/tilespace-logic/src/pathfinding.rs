//! Grid pathfinding: 8-directional A* plus line-of-sight smoothing.
//!
//! `Pathfinder` searches over a [`CollisionIndex`] using `can_step` as the
//! edge predicate, so every returned path respects the no-corner-cutting
//! rule. Costs are integers (10 per orthogonal step, 14 per diagonal) with
//! a matching octile heuristic. A node-expansion cap keeps a single query
//! bounded on large maps.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::collision::CollisionIndex;
use crate::constants::{MAX_SEARCH_EXPANSIONS, NEAREST_WALKABLE_RADIUS};
use crate::geometry::{GridPos, Vec2};

/// Distance within which two border crossings count as one diagonal step.
const CORNER_TOLERANCE: f32 = 1e-3;

const ORTHOGONAL_COST: u32 = 10;
const DIAGONAL_COST: u32 = 14;

const NEIGHBOR_STEPS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// A* search with a bounded number of node expansions.
#[derive(Debug, Clone, Copy)]
pub struct Pathfinder {
    pub max_expansions: usize,
    /// Ring radius used to retarget an unwalkable destination.
    pub retarget_radius: i32,
}

impl Default for Pathfinder {
    fn default() -> Self {
        Self {
            max_expansions: MAX_SEARCH_EXPANSIONS,
            retarget_radius: NEAREST_WALKABLE_RADIUS,
        }
    }
}

impl Pathfinder {
    pub fn new(max_expansions: usize, retarget_radius: i32) -> Self {
        Self {
            max_expansions,
            retarget_radius,
        }
    }

    /// Find a route from `start` to `end`, both included.
    ///
    /// An unwalkable in-bounds `end` is first moved to the nearest walkable
    /// cell. Returns `None` when either end is out of bounds, no walkable
    /// end exists nearby, the regions are disconnected, or the expansion cap
    /// is hit. `start` itself may be unwalkable (an occupant snapped onto
    /// furniture still needs to leave it).
    pub fn find_path(
        &self,
        index: &CollisionIndex,
        start: GridPos,
        end: GridPos,
    ) -> Option<Vec<GridPos>> {
        if !index.in_bounds(start) || !index.in_bounds(end) {
            return None;
        }
        let goal = if index.is_walkable(end) {
            end
        } else {
            index.find_nearest_walkable(end, self.retarget_radius)?
        };
        if start == goal {
            return Some(vec![start]);
        }

        let width = index.width() as usize;
        let cells = width * index.height() as usize;
        let slot = |c: GridPos| c.y as usize * width + c.x as usize;

        let mut g_score = vec![u32::MAX; cells];
        let mut came_from: Vec<Option<GridPos>> = vec![None; cells];
        let mut closed = vec![false; cells];
        let mut open = BinaryHeap::new();

        g_score[slot(start)] = 0;
        open.push(Reverse((octile_cost(start, goal), 0u32, start.y, start.x)));

        let mut expansions = 0usize;
        while let Some(Reverse((_, g, y, x))) = open.pop() {
            let current = GridPos::new(x, y);
            let ci = slot(current);
            if closed[ci] || g > g_score[ci] {
                continue;
            }
            if current == goal {
                return Some(reconstruct(&came_from, slot, start, goal));
            }
            closed[ci] = true;

            expansions += 1;
            if expansions > self.max_expansions {
                return None;
            }

            for &(dx, dy) in &NEIGHBOR_STEPS {
                let next = current.offset(dx, dy);
                if !index.can_step(current, next) {
                    continue;
                }
                let ni = slot(next);
                if closed[ni] {
                    continue;
                }
                let step = if dx != 0 && dy != 0 {
                    DIAGONAL_COST
                } else {
                    ORTHOGONAL_COST
                };
                let tentative = g + step;
                if tentative < g_score[ni] {
                    g_score[ni] = tentative;
                    came_from[ni] = Some(current);
                    let f = tentative + octile_cost(next, goal);
                    open.push(Reverse((f, tentative, next.y, next.x)));
                }
            }
        }

        None
    }
}

fn reconstruct(
    came_from: &[Option<GridPos>],
    slot: impl Fn(GridPos) -> usize,
    start: GridPos,
    goal: GridPos,
) -> Vec<GridPos> {
    let mut path = vec![goal];
    let mut node = goal;
    while node != start {
        match came_from[slot(node)] {
            Some(prev) => {
                path.push(prev);
                node = prev;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Integer octile distance in path-cost units.
fn octile_cost(a: GridPos, b: GridPos) -> u32 {
    let dx = (a.x - b.x).unsigned_abs();
    let dy = (a.y - b.y).unsigned_abs();
    ORTHOGONAL_COST * dx.max(dy) + (DIAGONAL_COST - ORTHOGONAL_COST) * dx.min(dy)
}

/// Collapse a path to the waypoints where its direction must change.
///
/// Greedy: from the current anchor, jump to the farthest later cell with a
/// clear line of sight. The first and last cells are always kept.
pub fn smooth_path(index: &CollisionIndex, path: &[GridPos]) -> Vec<GridPos> {
    if path.len() <= 2 {
        return path.to_vec();
    }
    let last = path.len() - 1;
    let mut smoothed = vec![path[0]];
    let mut anchor = 0;
    while anchor < last {
        let mut next = anchor + 1;
        for candidate in (anchor + 2..=last).rev() {
            if has_line_of_sight(index, path[anchor], path[candidate]) {
                next = candidate;
                break;
            }
        }
        smoothed.push(path[next]);
        anchor = next;
    }
    smoothed
}

/// Cell changes along the straight segment `from → to`.
///
/// Cells are the unit squares around integer centres. Each entry is the
/// fraction of the segment at which a cell is entered, starting with the
/// origin cell at `0.0`. Crossing a vertical and a horizontal cell border at
/// the same point (within `CORNER_TOLERANCE`) is a single diagonal step.
/// Borders crossed just past the end still count, so gliding a segment in
/// pieces checks the same steps as checking it whole.
pub fn segment_cells(from: Vec2, to: Vec2) -> Vec<(f32, GridPos)> {
    let mut cell = from.to_cell();
    let mut cells = vec![(0.0, cell)];
    let delta = to - from;
    let length = delta.length();
    if length <= f32::EPSILON {
        return cells;
    }
    let tolerance = CORNER_TOLERANCE / length;
    let (step_x, mut next_x, span_x) = first_crossing(from.x, delta.x, cell.x);
    let (step_y, mut next_y, span_y) = first_crossing(from.y, delta.y, cell.y);
    loop {
        let t = next_x.min(next_y);
        if t > 1.0 + tolerance {
            break;
        }
        if next_x - t <= tolerance {
            cell.x += step_x;
            next_x += span_x;
        }
        if next_y - t <= tolerance {
            cell.y += step_y;
            next_y += span_y;
        }
        cells.push((t, cell));
    }
    cells
}

/// Step sign, fraction of the first border crossing and fraction between
/// crossings along one axis.
fn first_crossing(origin: f32, delta: f32, cell: i32) -> (i32, f32, f32) {
    if delta > 0.0 {
        (1, (cell as f32 + 0.5 - origin) / delta, 1.0 / delta)
    } else if delta < 0.0 {
        (-1, (cell as f32 - 0.5 - origin) / delta, -1.0 / delta)
    } else {
        (0, f32::INFINITY, f32::INFINITY)
    }
}

/// Fraction of the segment at which it first makes an illegal step, or
/// `None` when an occupant can glide the whole way.
pub fn segment_blocked_at(index: &CollisionIndex, from: Vec2, to: Vec2) -> Option<f32> {
    segment_cells(from, to)
        .windows(2)
        .find(|w| !index.can_step(w[0].1, w[1].1))
        .map(|w| w[1].0)
}

/// Whether an occupant can glide straight from the centre of `a` to the
/// centre of `b`.
///
/// Every cell change along the way must be a legal step, so diagonal runs
/// cannot slip between corners. Movement checks the same cell changes while
/// gliding.
pub fn has_line_of_sight(index: &CollisionIndex, a: GridPos, b: GridPos) -> bool {
    segment_blocked_at(index, a.center(), b.center()).is_none()
}

/// One direct step from `from` toward `to`, without searching.
///
/// Tries the diagonal (or straight) step first, then horizontal only, then
/// vertical only. `None` means the caller must fall back to `find_path`.
pub fn get_next_step(index: &CollisionIndex, from: GridPos, to: GridPos) -> Option<GridPos> {
    let dx = (to.x - from.x).signum();
    let dy = (to.y - from.y).signum();
    if dx == 0 && dy == 0 {
        return None;
    }
    let direct = from.offset(dx, dy);
    if index.can_step(from, direct) {
        return Some(direct);
    }
    if dx != 0 && dy != 0 {
        let horizontal = from.offset(dx, 0);
        if index.can_step(from, horizontal) {
            return Some(horizontal);
        }
        let vertical = from.offset(0, dy);
        if index.can_step(from, vertical) {
            return Some(vertical);
        }
    }
    None
}

pub fn manhattan_distance(a: GridPos, b: GridPos) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

pub fn euclidean_distance(a: GridPos, b: GridPos) -> f32 {
    let dx = (a.x - b.x) as f32;
    let dy = (a.y - b.y) as f32;
    (dx * dx + dy * dy).sqrt()
}

/// Octile distance: diagonal moves cost √2.
pub fn octile_distance(a: GridPos, b: GridPos) -> f32 {
    let dx = (a.x - b.x).abs() as f32;
    let dy = (a.y - b.y).abs() as f32;
    dx.max(dy) + (std::f32::consts::SQRT_2 - 1.0) * dx.min(dy)
}

/// Total Euclidean length of a waypoint sequence.
pub fn path_length(path: &[GridPos]) -> f32 {
    path.windows(2)
        .map(|w| euclidean_distance(w[0], w[1]))
        .sum()
}
