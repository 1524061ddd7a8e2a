//! Occupant-related components: Local, Remote, DisplayName.

use serde::{Deserialize, Serialize};
use tilespace_logic::geometry::Vec2;
use tilespace_logic::movement::MovementStateKind;

/// Marker component for occupants driven by local intents.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Local;

/// An occupant mirrored from the presence roster.
///
/// Remote occupants glide toward their reported target without collision
/// checks and never take furniture locks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Remote {
    /// Where the roster says the occupant is heading.
    pub target: Option<Vec2>,
    /// State reported by the roster, shown as-is by renderers.
    pub reported_state: MovementStateKind,
}

impl Remote {
    pub fn new(target: Option<Vec2>, reported_state: MovementStateKind) -> Self {
        Self {
            target,
            reported_state,
        }
    }

    /// Step toward the reported target. Returns true on arrival.
    pub fn advance(&mut self, position: &mut Vec2, step: f32) -> bool {
        let Some(target) = self.target else {
            return false;
        };
        let delta = target - *position;
        let distance = delta.length();
        if distance <= step {
            *position = target;
            self.target = None;
            true
        } else {
            *position = *position + delta.normalize() * step;
            false
        }
    }
}

/// Human-readable occupant name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayName(pub String);

impl DisplayName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
