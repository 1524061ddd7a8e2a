//! Movement system - advances walking occupants and hands arrivals off to
//! the interaction system

use hecs::World;
use log::{debug, warn};
use tilespace_logic::collision::CollisionIndex;
use tilespace_logic::interaction::InteractionSystem;
use tilespace_logic::movement::{MovementController, Occupant, StepOutcome};

use crate::components::Local;
use crate::engine::TickReport;

/// Move local occupants along their routes by `delta_seconds`.
///
/// An occupant arriving with a pending furniture id immediately attempts the
/// interaction; a refused attempt leaves it idle on the approach cell.
pub fn movement_system(
    world: &mut World,
    index: &CollisionIndex,
    controller: &MovementController,
    interactions: &mut InteractionSystem,
    now: f64,
    delta_seconds: f32,
    report: &mut TickReport,
) {
    for (_entity, occupant) in world.query_mut::<&mut Occupant>().with::<&Local>() {
        match controller.update(index, occupant, delta_seconds) {
            StepOutcome::Resting | StepOutcome::Moving => {}
            StepOutcome::Blocked { at } => {
                debug!("Occupant #{} blocked at {:?}", occupant.id, at);
                report.blocked.push(occupant.id);
            }
            StepOutcome::Arrived { interaction } => {
                debug!("Occupant #{} arrived at {:?}", occupant.id, occupant.cell());
                report.arrivals.push(occupant.id);
                let Some(furniture) = interaction else {
                    continue;
                };
                match interactions.interact_by_id(index, occupant, furniture, now) {
                    Ok(kind) => report.started.push((occupant.id, furniture, kind)),
                    Err(e) => {
                        warn!("Occupant #{}: {}", occupant.id, e);
                        report.failed.push((occupant.id, e));
                    }
                }
            }
        }
    }
}
