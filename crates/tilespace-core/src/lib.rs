//! Tilespace Core - tile-based shared-space simulation engine
//!
//! An ECS-based simulation of occupants moving around a furnished tile map,
//! sitting on chairs, using computers and seeing each other through a
//! presence roster.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: local and remote occupants
//! - **Components**: `Occupant` state plus `Local`/`Remote` markers and names
//! - **Systems**: intent resolution, movement, interaction expiry, presence
//!
//! Grid algorithms (collision, A*, the movement state machine, furniture
//! locks) live in `tilespace-logic`; this crate wires them into a tick loop.
//!
//! # Example
//!
//! ```rust,no_run
//! use tilespace_core::prelude::*;
//! use tilespace_logic::geometry::GridPos;
//! use tilespace_logic::map::MapSnapshot;
//!
//! let mut engine = SimulationEngine::new();
//! engine.load_map(MapSnapshot::open(16, 12)).unwrap();
//! engine.join(1, "Ada", GridPos::new(0, 0)).unwrap();
//! engine.queue_click(1, GridPos::new(8, 6)).unwrap();
//!
//! loop {
//!     let report = engine.update(1.0 / 60.0); // 60 FPS
//!     if !report.arrivals.is_empty() {
//!         break;
//!     }
//! }
//! ```

pub mod components;
pub mod engine;
pub mod loader;
pub mod snapshot;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::{EngineError, SimulationEngine, TickReport};
    pub use crate::snapshot::WorldSnapshot;
    pub use crate::systems::{PresenceUpdate, RemoteOccupant, RosterChanges};
}
