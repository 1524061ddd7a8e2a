//! Exclusive furniture occupancy and interaction behaviors.
//!
//! The occupancy table (furniture id → occupant id) is owned here and only
//! written through `InteractionSystem` methods. First successful `interact`
//! wins; there is no queue.
//!
//! | Kind | Position | State | Release |
//! |------|----------|-------|---------|
//! | `sit` | snapped to centroid | `Sitting` | explicit stop |
//! | `sleep` | snapped to centroid | `Lying` | explicit stop |
//! | `use` | unchanged | `Using` | after `use_duration` |
//! | `examine` / `open` | unchanged | `Using` | after `brief_duration` |
//!
//! Every release path compares the lock holder with the releasing occupant,
//! so a late timeout can never clear a lock someone else has since taken.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::collision::CollisionIndex;
use crate::config::SimConfig;
use crate::constants::{BRIEF_DURATION, USE_DURATION};
use crate::geometry::Vec2;
use crate::map::{FurnitureSpec, InteractionKind};
use crate::movement::{ActivityPhase, MovementState, Occupant};
use crate::{FurnitureId, OccupantId};

/// Why an interaction was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionError {
    /// Another occupant holds the furniture.
    Occupied {
        furniture: FurnitureId,
        holder: OccupantId,
    },
    /// The furniture has no usable interaction.
    NotInteractive(FurnitureId),
    /// No furniture with this id on the current map.
    UnknownFurniture(FurnitureId),
}

impl InteractionError {
    /// Human-readable reason, suitable for a UI toast.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for InteractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InteractionError::Occupied { furniture, holder } => write!(
                f,
                "Furniture #{} is occupied by occupant #{}",
                furniture, holder
            ),
            InteractionError::NotInteractive(id) => {
                write!(f, "Furniture #{} cannot be interacted with", id)
            }
            InteractionError::UnknownFurniture(id) => write!(f, "No furniture #{}", id),
        }
    }
}

impl std::error::Error for InteractionError {}

/// A ranked furniture suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub furniture: FurnitureId,
    pub distance: f32,
}

/// Owner of the occupancy table.
#[derive(Debug, Clone)]
pub struct InteractionSystem {
    occupancy: HashMap<FurnitureId, OccupantId>,
    use_duration: f64,
    brief_duration: f64,
}

impl Default for InteractionSystem {
    fn default() -> Self {
        Self {
            occupancy: HashMap::new(),
            use_duration: USE_DURATION,
            brief_duration: BRIEF_DURATION,
        }
    }
}

impl InteractionSystem {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            occupancy: HashMap::new(),
            use_duration: config.use_duration,
            brief_duration: config.brief_duration,
        }
    }

    /// Start interacting with `furniture` at simulation time `now`.
    ///
    /// Fails without touching anything if another occupant holds it or it
    /// has no interaction. A different furniture the occupant was holding
    /// is released first.
    pub fn interact(
        &mut self,
        occupant: &mut Occupant,
        furniture: &FurnitureSpec,
        now: f64,
    ) -> Result<InteractionKind, InteractionError> {
        if let Some(&holder) = self.occupancy.get(&furniture.id) {
            if holder != occupant.id {
                return Err(InteractionError::Occupied {
                    furniture: furniture.id,
                    holder,
                });
            }
        }
        let kind = match (furniture.interactive, furniture.interaction) {
            (true, Some(kind)) => kind,
            _ => return Err(InteractionError::NotInteractive(furniture.id)),
        };

        if let Some(previous) = occupant.held_furniture() {
            if previous != furniture.id {
                self.release(previous, occupant.id);
            }
        }

        occupant.state = match kind {
            InteractionKind::Sit => {
                occupant.position = furniture.centroid();
                MovementState::Sitting {
                    furniture: furniture.id,
                }
            }
            InteractionKind::Sleep => {
                occupant.position = furniture.centroid();
                MovementState::Lying {
                    furniture: furniture.id,
                }
            }
            InteractionKind::Use => MovementState::Using {
                furniture: furniture.id,
                expires_at: now + self.use_duration,
            },
            InteractionKind::Examine | InteractionKind::Open => MovementState::Using {
                furniture: furniture.id,
                expires_at: now + self.brief_duration,
            },
        };
        self.occupancy.insert(furniture.id, occupant.id);
        Ok(kind)
    }

    /// Look up `furniture_id` on the map and interact with it.
    pub fn interact_by_id(
        &mut self,
        index: &CollisionIndex,
        occupant: &mut Occupant,
        furniture_id: FurnitureId,
        now: f64,
    ) -> Result<InteractionKind, InteractionError> {
        let furniture = index
            .furniture(furniture_id)
            .ok_or(InteractionError::UnknownFurniture(furniture_id))?;
        self.interact(occupant, furniture, now)
    }

    /// End the occupant's interaction and return it to idle.
    ///
    /// `furniture` defaults to whatever the occupant holds. The lock is
    /// cleared only if it still belongs to this occupant. Returns whether a
    /// lock was cleared.
    pub fn stop_interaction(
        &mut self,
        occupant: &mut Occupant,
        furniture: Option<FurnitureId>,
    ) -> bool {
        let target = furniture.or_else(|| occupant.held_furniture());
        occupant.state = MovementState::Idle;
        match target {
            Some(id) => self.release(id, occupant.id),
            None => false,
        }
    }

    /// Auto-release a timed interaction whose deadline has passed.
    ///
    /// The occupant always returns to idle once due, but the furniture is
    /// returned only if its lock was actually cleared.
    pub fn expire_due(&mut self, occupant: &mut Occupant, now: f64) -> Option<FurnitureId> {
        match occupant.state {
            MovementState::Using {
                furniture,
                expires_at,
            } if now >= expires_at => self
                .stop_interaction(occupant, Some(furniture))
                .then_some(furniture),
            _ => None,
        }
    }

    /// Clear the lock on `furniture` if `occupant` holds it.
    pub fn release(&mut self, furniture: FurnitureId, occupant: OccupantId) -> bool {
        if self.occupancy.get(&furniture) == Some(&occupant) {
            self.occupancy.remove(&furniture);
            true
        } else {
            false
        }
    }

    /// Drop every lock held by `occupant` (used when it leaves).
    pub fn release_all(&mut self, occupant: OccupantId) -> Vec<FurnitureId> {
        let mut released: Vec<FurnitureId> = self
            .occupancy
            .iter()
            .filter(|&(_, &holder)| holder == occupant)
            .map(|(&id, _)| id)
            .collect();
        released.sort_unstable();
        for id in &released {
            self.occupancy.remove(id);
        }
        released
    }

    /// Forget all locks (map rebuild).
    pub fn clear(&mut self) {
        self.occupancy.clear();
    }

    pub fn occupant_of(&self, furniture: FurnitureId) -> Option<OccupantId> {
        self.occupancy.get(&furniture).copied()
    }

    pub fn is_occupied(&self, furniture: FurnitureId) -> bool {
        self.occupancy.contains_key(&furniture)
    }

    pub fn occupied_count(&self) -> usize {
        self.occupancy.len()
    }

    /// Unoccupied furniture matching `phase`, nearest first.
    pub fn suggestions_for_status(
        &self,
        index: &CollisionIndex,
        phase: ActivityPhase,
        position: Vec2,
    ) -> Vec<Suggestion> {
        let wanted = phase.suggested_types();
        let mut suggestions: Vec<Suggestion> = index
            .furniture_iter()
            .filter(|f| wanted.contains(&f.furniture_type))
            .filter(|f| !self.is_occupied(f.id))
            .map(|f| Suggestion {
                furniture: f.id,
                distance: position.distance(&f.centroid()),
            })
            .collect();
        suggestions.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.furniture.cmp(&b.furniture))
        });
        suggestions
    }
}
