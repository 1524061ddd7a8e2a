//! Intent system - resolves queued intents into movement commands

use std::collections::{HashMap, VecDeque};

use hecs::{Entity, World};
use log::debug;
use tilespace_logic::collision::CollisionIndex;
use tilespace_logic::geometry::GridPos;
use tilespace_logic::interaction::InteractionSystem;
use tilespace_logic::movement::{Facing, MovementCommand, MovementController, Occupant};
use tilespace_logic::OccupantId;

use crate::components::Local;
use crate::engine::TickReport;

/// A raw input captured between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Pointer click already converted to a grid cell.
    Click { occupant: OccupantId, cell: GridPos },
    /// One cardinal step.
    Key {
        occupant: OccupantId,
        direction: Facing,
    },
    /// Cancel walking and leave any furniture.
    Stop { occupant: OccupantId },
}

impl Intent {
    pub fn occupant(&self) -> OccupantId {
        match *self {
            Intent::Click { occupant, .. }
            | Intent::Key { occupant, .. }
            | Intent::Stop { occupant } => occupant,
        }
    }
}

/// Drain every queued intent in FIFO order and apply the resulting commands.
///
/// Unresolvable intents (blocked, unreachable, unknown or remote occupant)
/// are dropped without touching the occupant. Furniture held when a new
/// command arrives is released through `interactions`.
pub fn intents_system(
    world: &mut World,
    entities: &HashMap<OccupantId, Entity>,
    index: &CollisionIndex,
    controller: &MovementController,
    interactions: &mut InteractionSystem,
    queue: &mut VecDeque<Intent>,
    now: f64,
    report: &mut TickReport,
) {
    while let Some(intent) = queue.pop_front() {
        let id = intent.occupant();
        let Some(&entity) = entities.get(&id) else {
            debug!("Dropping {:?}: occupant #{} left", intent, id);
            report.dropped_intents += 1;
            continue;
        };
        if world.get::<&Local>(entity).is_err() {
            debug!("Dropping {:?}: occupant #{} is remote", intent, id);
            report.dropped_intents += 1;
            continue;
        }
        let Ok(mut occupant) = world.get::<&mut Occupant>(entity) else {
            report.dropped_intents += 1;
            continue;
        };

        let command = match resolve(index, controller, &occupant, intent, now) {
            Some(command) => command,
            None => {
                debug!("Dropping {:?}: no legal destination", intent);
                report.dropped_intents += 1;
                continue;
            }
        };

        if let Some(held) = controller.process_command(&mut occupant, &command) {
            if interactions.release(held, id) {
                report.released.push((id, held));
            }
        }
    }
}

fn resolve(
    index: &CollisionIndex,
    controller: &MovementController,
    occupant: &Occupant,
    intent: Intent,
    now: f64,
) -> Option<MovementCommand> {
    match intent {
        Intent::Click { cell, .. } => controller.resolve_click(index, occupant, cell, now),
        Intent::Key { direction, .. } => controller.resolve_key(index, occupant, direction, now),
        Intent::Stop { .. } => Some(MovementCommand::stop(occupant.position, now)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Remote;
    use tilespace_logic::geometry::Vec2;
    use tilespace_logic::map::{FurnitureSpec, FurnitureType, InteractionKind, MapSnapshot};
    use tilespace_logic::movement::MovementState;

    struct Fixture {
        world: World,
        entities: HashMap<OccupantId, Entity>,
        index: CollisionIndex,
        controller: MovementController,
        interactions: InteractionSystem,
    }

    fn fixture() -> Fixture {
        let mut map = MapSnapshot::from_rows(&[
            "......", //
            "..#...", //
            "......", //
        ]);
        map.furniture.push(
            FurnitureSpec::new(1, FurnitureType::Chair, GridPos::new(5, 2), 1, 1)
                .with_interaction(InteractionKind::Sit),
        );
        let mut world = World::new();
        let mut entities = HashMap::new();
        let e = world.spawn((Occupant::new(7, Vec2::new(0.0, 0.0)), Local));
        entities.insert(7, e);
        Fixture {
            world,
            entities,
            index: CollisionIndex::build(&map),
            controller: MovementController::default(),
            interactions: InteractionSystem::default(),
        }
    }

    fn run(f: &mut Fixture, intents: &[Intent]) -> TickReport {
        let mut queue: VecDeque<Intent> = intents.iter().copied().collect();
        let mut report = TickReport::default();
        intents_system(
            &mut f.world,
            &f.entities,
            &f.index,
            &f.controller,
            &mut f.interactions,
            &mut queue,
            0.0,
            &mut report,
        );
        assert!(queue.is_empty());
        report
    }

    fn occupant(f: &Fixture) -> Occupant {
        (*f.world.get::<&Occupant>(f.entities[&7]).unwrap()).clone()
    }

    #[test]
    fn click_starts_walking_without_moving() {
        let mut f = fixture();
        let report = run(
            &mut f,
            &[Intent::Click {
                occupant: 7,
                cell: GridPos::new(4, 0),
            }],
        );
        assert_eq!(report.dropped_intents, 0);
        let occ = occupant(&f);
        assert_eq!(occ.target_position(), Some(Vec2::new(4.0, 0.0)));
        assert_eq!(occ.position, Vec2::new(0.0, 0.0));
    }

    #[test]
    fn blocked_and_unknown_intents_are_dropped() {
        let mut f = fixture();
        let report = run(
            &mut f,
            &[
                Intent::Click {
                    occupant: 7,
                    cell: GridPos::new(2, 1),
                },
                Intent::Key {
                    occupant: 7,
                    direction: Facing::Up,
                },
                Intent::Stop { occupant: 99 },
            ],
        );
        assert_eq!(report.dropped_intents, 3);
        assert_eq!(occupant(&f).state, MovementState::Idle);
    }

    #[test]
    fn last_intent_wins() {
        let mut f = fixture();
        run(
            &mut f,
            &[
                Intent::Click {
                    occupant: 7,
                    cell: GridPos::new(4, 0),
                },
                Intent::Key {
                    occupant: 7,
                    direction: Facing::Down,
                },
            ],
        );
        assert_eq!(occupant(&f).target_position(), Some(Vec2::new(0.0, 1.0)));
    }

    #[test]
    fn new_command_releases_held_furniture() {
        let mut f = fixture();
        {
            let mut occ = f.world.get::<&mut Occupant>(f.entities[&7]).unwrap();
            occ.position = Vec2::new(4.0, 2.0);
            f.interactions.interact_by_id(&f.index, &mut occ, 1, 0.0).unwrap();
        }
        assert_eq!(f.interactions.occupant_of(1), Some(7));

        let report = run(&mut f, &[Intent::Stop { occupant: 7 }]);
        assert_eq!(report.released, vec![(7, 1)]);
        assert_eq!(f.interactions.occupant_of(1), None);
        assert_eq!(occupant(&f).state, MovementState::Idle);
    }

    #[test]
    fn remote_occupants_ignore_intents() {
        let mut f = fixture();
        let e = f.world.spawn((
            Occupant::new(8, Vec2::new(1.0, 0.0)),
            Remote::new(None, tilespace_logic::movement::MovementStateKind::Idle),
        ));
        f.entities.insert(8, e);
        let report = run(&mut f, &[Intent::Stop { occupant: 8 }]);
        assert_eq!(report.dropped_intents, 1);
    }
}
