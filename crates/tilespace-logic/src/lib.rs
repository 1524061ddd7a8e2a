//! Pure grid logic for Tilespace.
//!
//! This crate contains all spatial simulation logic that is independent of
//! any ECS, renderer, or network layer. Functions take plain data and return
//! results, making them unit-testable and reusable from the engine, the
//! headless harness, and benchmarks.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`collision`] | Walkability grid built from tiles + furniture footprints |
//! | [`config`] | Simulation tunables and the pointer-to-grid viewport |
//! | [`constants`] | Reference speeds, interaction durations, search limits |
//! | [`geometry`] | Integer grid cells and continuous 2-D vectors |
//! | [`interaction`] | Furniture occupancy locks, timed release, suggestions |
//! | [`map`] | Map snapshot format, furniture definitions, validation |
//! | [`movement`] | Intent resolution, occupant state machine, position update |
//! | [`pathfinding`] | 8-directional A* with line-of-sight smoothing |

pub mod collision;
pub mod config;
pub mod constants;
pub mod geometry;
pub mod interaction;
pub mod map;
pub mod movement;
pub mod pathfinding;

/// Identifier of an occupant (local or remote).
pub type OccupantId = u64;

/// Identifier of a furniture instance, unique within one map.
pub type FurnitureId = u32;
