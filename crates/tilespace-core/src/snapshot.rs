//! Read-only world snapshots for renderers.
//!
//! A snapshot is rebuilt from the ECS world on demand and owns all its
//! data, so a renderer can hold it across frames or ship it as JSON.

use serde::{Deserialize, Serialize};
use tilespace_logic::map::{FurnitureType, InteractionKind};
use tilespace_logic::movement::{ActivityPhase, Facing, MovementStateKind};
use tilespace_logic::{FurnitureId, OccupantId};

/// One occupant as a renderer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupantView {
    pub id: OccupantId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub facing: Facing,
    pub state: MovementStateKind,
    pub phase: ActivityPhase,
    pub remote: bool,
    /// Furniture walked to or held.
    pub interaction: Option<FurnitureId>,
}

/// One furniture footprint with its current occupant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurnitureView {
    pub id: FurnitureId,
    #[serde(rename = "type")]
    pub furniture_type: FurnitureType,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub interaction: Option<InteractionKind>,
    pub occupant: Option<OccupantId>,
}

/// Everything needed to draw one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Simulation time in seconds.
    pub sim_time: f64,
    pub width: i32,
    pub height: i32,
    /// Ordered by id.
    pub occupants: Vec<OccupantView>,
    /// Ordered by id.
    pub furniture: Vec<FurnitureView>,
}

impl WorldSnapshot {
    pub fn occupant(&self, id: OccupantId) -> Option<&OccupantView> {
        self.occupants.iter().find(|o| o.id == id)
    }

    pub fn furniture(&self, id: FurnitureId) -> Option<&FurnitureView> {
        self.furniture.iter().find(|f| f.id == id)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
