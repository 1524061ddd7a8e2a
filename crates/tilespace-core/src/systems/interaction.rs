//! Interaction expiry system - auto-releases timed interactions

use hecs::World;
use log::debug;
use tilespace_logic::interaction::InteractionSystem;
use tilespace_logic::movement::Occupant;

use crate::components::Local;
use crate::engine::TickReport;

/// Return every local occupant whose timed interaction is due to idle.
pub fn expiry_system(
    world: &mut World,
    interactions: &mut InteractionSystem,
    now: f64,
    report: &mut TickReport,
) {
    for (_entity, occupant) in world.query_mut::<&mut Occupant>().with::<&Local>() {
        if let Some(furniture) = interactions.expire_due(occupant, now) {
            debug!("Occupant #{} finished with furniture #{}", occupant.id, furniture);
            report.released.push((occupant.id, furniture));
        }
    }
}
