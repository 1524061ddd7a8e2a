//! Component definitions for the ECS simulation.
//!
//! Occupant entities carry a [`tilespace_logic::movement::Occupant`] for
//! position and movement state plus the components below. Behavior lives in
//! systems.

mod occupant;

pub use occupant::*;
