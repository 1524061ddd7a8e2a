//! Presence system - remote roster ingestion and local presence publishing

use std::collections::{HashMap, HashSet};

use hecs::{Entity, World};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tilespace_logic::geometry::Vec2;
use tilespace_logic::movement::{ActivityPhase, Facing, MovementStateKind, Occupant};
use tilespace_logic::{FurnitureId, OccupantId};

use crate::components::{DisplayName, Local, Remote};

/// One entry of the roster delivered by the presence service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteOccupant {
    pub id: OccupantId,
    pub name: String,
    pub position: Vec2,
    #[serde(default)]
    pub target: Option<Vec2>,
    #[serde(default)]
    pub facing: Facing,
    pub state: MovementStateKind,
    #[serde(default)]
    pub phase: ActivityPhase,
}

/// What the engine publishes about a local occupant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    pub id: OccupantId,
    pub position: Vec2,
    pub facing: Facing,
    pub phase: ActivityPhase,
    pub state: MovementStateKind,
    pub interaction: Option<FurnitureId>,
}

/// Ids touched by one `apply_roster` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterChanges {
    pub spawned: Vec<OccupantId>,
    pub updated: Vec<OccupantId>,
    pub despawned: Vec<OccupantId>,
}

/// Mirror the roster into the world: unknown ids spawn, known ids update,
/// remote ids missing from the roster despawn.
///
/// Roster entries that reuse a local occupant's id are ignored.
pub fn apply_roster(
    world: &mut World,
    entities: &mut HashMap<OccupantId, Entity>,
    roster: &[RemoteOccupant],
) -> RosterChanges {
    let mut changes = RosterChanges::default();
    let mut seen = HashSet::with_capacity(roster.len());

    for entry in roster {
        if !seen.insert(entry.id) {
            warn!("Roster lists occupant #{} twice; keeping the first", entry.id);
            continue;
        }
        match entities.get(&entry.id).copied() {
            Some(entity) if world.get::<&Local>(entity).is_ok() => {
                warn!("Roster id #{} collides with a local occupant", entry.id);
            }
            Some(entity) => {
                if let Ok(mut occ) = world.get::<&mut Occupant>(entity) {
                    occ.position = entry.position;
                    occ.facing = entry.facing;
                    occ.phase = entry.phase;
                }
                if let Ok(mut remote) = world.get::<&mut Remote>(entity) {
                    *remote = Remote::new(entry.target, entry.state);
                }
                if let Ok(mut name) = world.get::<&mut DisplayName>(entity) {
                    if name.0 != entry.name {
                        name.0 = entry.name.clone();
                    }
                }
                changes.updated.push(entry.id);
            }
            None => {
                let mut occ = Occupant::new(entry.id, entry.position);
                occ.facing = entry.facing;
                occ.phase = entry.phase;
                let entity = world.spawn((
                    occ,
                    Remote::new(entry.target, entry.state),
                    DisplayName::new(entry.name.clone()),
                ));
                entities.insert(entry.id, entity);
                info!("Remote occupant #{} ({}) appeared", entry.id, entry.name);
                changes.spawned.push(entry.id);
            }
        }
    }

    let mut gone: Vec<(OccupantId, Entity)> = entities
        .iter()
        .filter(|&(id, _)| !seen.contains(id))
        .filter(|&(_, &entity)| world.get::<&Remote>(entity).is_ok())
        .map(|(&id, &entity)| (id, entity))
        .collect();
    gone.sort_unstable_by_key(|(id, _)| *id);
    for (id, entity) in gone {
        let _ = world.despawn(entity);
        entities.remove(&id);
        info!("Remote occupant #{} left", id);
        changes.despawned.push(id);
    }

    changes
}

/// Glide remote occupants toward their reported targets. No collision
/// checks and no furniture locking.
pub fn remote_motion_system(world: &mut World, speed: f32, delta_seconds: f32) {
    let step = (speed * delta_seconds).max(0.0);
    for (_entity, (occupant, remote)) in world.query_mut::<(&mut Occupant, &mut Remote)>() {
        let from = occupant.position;
        if let Some(target) = remote.target {
            if let Some(facing) = Facing::from_delta(target - from) {
                occupant.facing = facing;
            }
        }
        remote.advance(&mut occupant.position, step);
    }
}

/// Presence updates for every local occupant, ordered by id.
pub fn collect_presence(world: &World) -> Vec<PresenceUpdate> {
    let mut updates: Vec<PresenceUpdate> = world
        .query::<&Occupant>()
        .with::<&Local>()
        .iter()
        .map(|(_, occ)| PresenceUpdate {
            id: occ.id,
            position: occ.position,
            facing: occ.facing,
            phase: occ.phase,
            state: occ.state.kind(),
            interaction: occ.current_interaction(),
        })
        .collect();
    updates.sort_unstable_by_key(|u| u.id);
    updates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: OccupantId, x: f32, y: f32) -> RemoteOccupant {
        RemoteOccupant {
            id,
            name: format!("guest-{}", id),
            position: Vec2::new(x, y),
            target: None,
            facing: Facing::Down,
            state: MovementStateKind::Idle,
            phase: ActivityPhase::Offline,
        }
    }

    #[test]
    fn roster_spawns_updates_and_despawns() {
        let mut world = World::new();
        let mut entities = HashMap::new();

        let changes = apply_roster(&mut world, &mut entities, &[entry(10, 1.0, 1.0), entry(11, 2.0, 2.0)]);
        assert_eq!(changes.spawned, vec![10, 11]);
        assert_eq!(world.len(), 2);

        let mut moved = entry(10, 3.0, 1.0);
        moved.phase = ActivityPhase::Focus;
        let changes = apply_roster(&mut world, &mut entities, &[moved]);
        assert_eq!(changes.updated, vec![10]);
        assert_eq!(changes.despawned, vec![11]);
        assert_eq!(world.len(), 1);

        let occ = world.get::<&Occupant>(entities[&10]).unwrap();
        assert_eq!(occ.position, Vec2::new(3.0, 1.0));
        assert_eq!(occ.phase, ActivityPhase::Focus);
    }

    #[test]
    fn roster_never_touches_local_occupants() {
        let mut world = World::new();
        let mut entities = HashMap::new();
        let local = world.spawn((Occupant::new(1, Vec2::new(0.0, 0.0)), Local));
        entities.insert(1, local);

        let changes = apply_roster(&mut world, &mut entities, &[entry(1, 5.0, 5.0)]);
        assert_eq!(changes, RosterChanges::default());
        assert_eq!(world.get::<&Occupant>(local).unwrap().position, Vec2::new(0.0, 0.0));

        // An empty roster despawns remotes only.
        apply_roster(&mut world, &mut entities, &[]);
        assert!(world.contains(local));
    }

    #[test]
    fn duplicate_roster_entries_keep_first() {
        let mut world = World::new();
        let mut entities = HashMap::new();
        let changes = apply_roster(&mut world, &mut entities, &[entry(5, 1.0, 0.0), entry(5, 9.0, 0.0)]);
        assert_eq!(changes.spawned, vec![5]);
        let occ = world.get::<&Occupant>(entities[&5]).unwrap();
        assert_eq!(occ.position, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn remotes_glide_toward_target() {
        let mut world = World::new();
        let mut entities = HashMap::new();
        let mut walking = entry(3, 0.0, 0.0);
        walking.target = Some(Vec2::new(0.0, 6.0));
        walking.state = MovementStateKind::Walking;
        apply_roster(&mut world, &mut entities, &[walking]);

        remote_motion_system(&mut world, 3.0, 1.0);
        let occ = world.get::<&Occupant>(entities[&3]).unwrap();
        assert_eq!(occ.position, Vec2::new(0.0, 3.0));
        assert_eq!(occ.facing, Facing::Down);
    }

    #[test]
    fn presence_covers_local_occupants_only() {
        let mut world = World::new();
        let mut entities = HashMap::new();
        let mut a = Occupant::new(2, Vec2::new(1.0, 1.0));
        a.phase = ActivityPhase::ShortBreak;
        world.spawn((a, Local));
        world.spawn((Occupant::new(1, Vec2::new(0.0, 0.0)), Local));
        apply_roster(&mut world, &mut entities, &[entry(50, 4.0, 4.0)]);

        let updates = collect_presence(&world);
        let ids: Vec<_> = updates.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(updates[1].phase, ActivityPhase::ShortBreak);
        assert_eq!(updates[1].state, MovementStateKind::Idle);
    }
}
