//! Simulation engine - main entry point for running the simulation

use std::collections::{HashMap, VecDeque};

use hecs::{Entity, World};
use log::{debug, info, warn};
use tilespace_logic::collision::CollisionIndex;
use tilespace_logic::config::{ConfigError, SimConfig};
use tilespace_logic::geometry::{GridPos, Vec2};
use tilespace_logic::interaction::{InteractionError, InteractionSystem, Suggestion};
use tilespace_logic::map::{InteractionKind, MapError, MapSnapshot};
use tilespace_logic::movement::{ActivityPhase, Facing, MovementController, MovementState, Occupant};
use tilespace_logic::{FurnitureId, OccupantId};

use crate::components::*;
use crate::snapshot::{FurnitureView, OccupantView, WorldSnapshot};
use crate::systems::*;

/// What happened during one `update`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Occupants that reached their target.
    pub arrivals: Vec<OccupantId>,
    /// Interactions started on arrival.
    pub started: Vec<(OccupantId, FurnitureId, InteractionKind)>,
    /// Interactions refused on arrival.
    pub failed: Vec<(OccupantId, InteractionError)>,
    /// Locks released by new commands, stops or timeouts.
    pub released: Vec<(OccupantId, FurnitureId)>,
    /// Occupants stopped by a blocked cell transition.
    pub blocked: Vec<OccupantId>,
    /// Intents that could not be turned into a command.
    pub dropped_intents: usize,
    /// Whether presence updates were queued this tick.
    pub presence_published: bool,
}

/// Main simulation engine
pub struct SimulationEngine {
    /// ECS world containing all occupant entities
    pub world: World,
    /// Simulation time in seconds since start
    pub sim_time: f64,
    config: SimConfig,
    map: Option<MapSnapshot>,
    collision: Option<CollisionIndex>,
    controller: MovementController,
    interactions: InteractionSystem,
    intents: VecDeque<Intent>,
    entities: HashMap<OccupantId, Entity>,
    presence: Vec<PresenceUpdate>,
    last_presence_update: f64,
}

impl SimulationEngine {
    /// Create an engine with default settings and no map
    pub fn new() -> Self {
        Self::build(SimConfig::default())
    }

    /// Create an engine with custom settings
    pub fn with_config(config: SimConfig) -> Result<Self, EngineError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(EngineError::InvalidConfig(errors));
        }
        Ok(Self::build(config))
    }

    fn build(config: SimConfig) -> Self {
        Self {
            world: World::new(),
            sim_time: 0.0,
            controller: MovementController::from_config(&config),
            interactions: InteractionSystem::from_config(&config),
            config,
            map: None,
            collision: None,
            intents: VecDeque::new(),
            entities: HashMap::new(),
            presence: Vec::new(),
            last_presence_update: 0.0,
        }
    }

    /// Install a map, rebuilding the collision grid from scratch.
    ///
    /// On a rebuild every lock is dropped and every local occupant returns
    /// to idle where it stands; queued intents are kept.
    pub fn load_map(&mut self, map: MapSnapshot) -> Result<(), EngineError> {
        let errors = map.validate();
        if !errors.is_empty() {
            return Err(EngineError::InvalidMap(errors));
        }

        match self.collision.as_mut() {
            Some(index) => {
                index.rebuild(&map);
                self.interactions.clear();
                for (_entity, occupant) in self.world.query_mut::<&mut Occupant>().with::<&Local>() {
                    occupant.state = MovementState::Idle;
                }
                info!("Map rebuilt: {}x{}, {} furniture", map.width, map.height, map.furniture.len());
            }
            None => {
                self.collision = Some(CollisionIndex::build(&map));
                info!("Map loaded: {}x{}, {} furniture", map.width, map.height, map.furniture.len());
            }
        }
        self.map = Some(map);
        Ok(())
    }

    /// Add a local occupant standing on `cell`.
    ///
    /// An unwalkable spawn cell is moved to the nearest walkable one when a
    /// map is loaded.
    pub fn join(
        &mut self,
        id: OccupantId,
        name: impl Into<String>,
        cell: GridPos,
    ) -> Result<(), EngineError> {
        if self.entities.contains_key(&id) {
            return Err(EngineError::DuplicateOccupant(id));
        }
        let name = name.into();
        let spawn = match &self.collision {
            Some(index) if !index.is_walkable(cell) => index
                .find_nearest_walkable(cell, self.config.nearest_walkable_radius)
                .unwrap_or(cell),
            _ => cell,
        };
        let entity = self.world.spawn((
            Occupant::new(id, spawn.center()),
            Local,
            DisplayName::new(name.clone()),
        ));
        self.entities.insert(id, entity);
        info!("Occupant #{} ({}) joined at {:?}", id, name, spawn);
        Ok(())
    }

    /// Remove a local occupant, releasing every lock it held.
    pub fn leave(&mut self, id: OccupantId) -> Result<Vec<FurnitureId>, EngineError> {
        let entity = self.local_entity(id)?;
        let released = self.interactions.release_all(id);
        if let Err(e) = self.world.despawn(entity) {
            warn!("Occupant #{} had no entity to despawn: {}", id, e);
        }
        self.entities.remove(&id);
        info!("Occupant #{} left, released {:?}", id, released);
        Ok(released)
    }

    /// Queue a click on a grid cell.
    pub fn queue_click(&mut self, id: OccupantId, cell: GridPos) -> Result<(), EngineError> {
        self.local_entity(id)?;
        self.intents.push_back(Intent::Click { occupant: id, cell });
        Ok(())
    }

    /// Queue a click given in screen pixels, converted with the configured viewport.
    pub fn queue_pointer(&mut self, id: OccupantId, px: f32, py: f32) -> Result<(), EngineError> {
        let cell = self.config.viewport.pointer_to_cell(px, py);
        self.queue_click(id, cell)
    }

    /// Queue a one-cell step.
    pub fn queue_step(&mut self, id: OccupantId, direction: Facing) -> Result<(), EngineError> {
        self.local_entity(id)?;
        self.intents.push_back(Intent::Key {
            occupant: id,
            direction,
        });
        Ok(())
    }

    /// Queue a key press. Returns `Ok(false)` for keys that do not map to a
    /// direction.
    pub fn queue_key(&mut self, id: OccupantId, key: &str) -> Result<bool, EngineError> {
        match Facing::from_key(key) {
            Some(direction) => self.queue_step(id, direction).map(|_| true),
            None => {
                self.local_entity(id)?;
                debug!("Ignoring unmapped key {:?}", key);
                Ok(false)
            }
        }
    }

    /// Queue a stop: cancel walking and leave any furniture.
    pub fn queue_stop(&mut self, id: OccupantId) -> Result<(), EngineError> {
        self.local_entity(id)?;
        self.intents.push_back(Intent::Stop { occupant: id });
        Ok(())
    }

    pub fn pending_intents(&self) -> usize {
        self.intents.len()
    }

    pub fn set_phase(&mut self, id: OccupantId, phase: ActivityPhase) -> Result<(), EngineError> {
        let entity = self.local_entity(id)?;
        if let Ok(mut occupant) = self.world.get::<&mut Occupant>(entity) {
            occupant.phase = phase;
        }
        Ok(())
    }

    /// Interactive furniture under (or within hover range of) a cell.
    pub fn hover(&self, cell: GridPos) -> Vec<FurnitureId> {
        match &self.collision {
            Some(index) => index
                .nearby_interactive(cell, self.config.hover_range)
                .iter()
                .map(|f| f.id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Unoccupied furniture suited to the occupant's current phase, nearest first.
    pub fn suggestions(&self, id: OccupantId) -> Result<Vec<Suggestion>, EngineError> {
        let index = self.collision.as_ref().ok_or(EngineError::NoMap)?;
        let occupant = self.occupant(id).ok_or(EngineError::UnknownOccupant(id))?;
        Ok(self
            .interactions
            .suggestions_for_status(index, occupant.phase, occupant.position))
    }

    /// Update the simulation by delta_seconds
    pub fn update(&mut self, delta_seconds: f32) -> TickReport {
        let scaled_delta = (delta_seconds.max(0.0) as f64) * self.config.time_scale;
        self.sim_time += scaled_delta;
        let now = self.sim_time;
        let step = scaled_delta as f32;

        let mut report = TickReport::default();

        if let Some(index) = &self.collision {
            intents_system(
                &mut self.world,
                &self.entities,
                index,
                &self.controller,
                &mut self.interactions,
                &mut self.intents,
                now,
                &mut report,
            );
            movement_system(
                &mut self.world,
                index,
                &self.controller,
                &mut self.interactions,
                now,
                step,
                &mut report,
            );
        } else if !self.intents.is_empty() {
            warn!("Dropping {} intents: no map loaded", self.intents.len());
            report.dropped_intents += self.intents.len();
            self.intents.clear();
        }

        expiry_system(&mut self.world, &mut self.interactions, now, &mut report);
        remote_motion_system(&mut self.world, self.config.walk_speed, step);

        if now - self.last_presence_update >= self.config.presence_interval {
            self.presence.extend(collect_presence(&self.world));
            self.last_presence_update = now;
            report.presence_published = true;
        }

        report
    }

    /// Take every queued presence update.
    pub fn drain_presence(&mut self) -> Vec<PresenceUpdate> {
        std::mem::take(&mut self.presence)
    }

    /// Mirror the presence roster into the world.
    pub fn apply_roster(&mut self, roster: &[RemoteOccupant]) -> RosterChanges {
        apply_roster(&mut self.world, &mut self.entities, roster)
    }

    /// Build a renderer snapshot of the current state.
    pub fn snapshot(&self) -> WorldSnapshot {
        let mut occupants: Vec<OccupantView> = self
            .world
            .query::<(&Occupant, Option<&DisplayName>, Option<&Remote>)>()
            .iter()
            .map(|(_, (occ, name, remote))| OccupantView {
                id: occ.id,
                name: name.map(|n| n.0.clone()).unwrap_or_default(),
                x: occ.position.x,
                y: occ.position.y,
                facing: occ.facing,
                state: remote.map_or(occ.state.kind(), |r| r.reported_state),
                phase: occ.phase,
                remote: remote.is_some(),
                interaction: occ.current_interaction(),
            })
            .collect();
        occupants.sort_unstable_by_key(|o| o.id);

        let (width, height, mut furniture) = match &self.map {
            Some(map) => (
                map.width,
                map.height,
                map.furniture
                    .iter()
                    .map(|f| FurnitureView {
                        id: f.id,
                        furniture_type: f.furniture_type,
                        x: f.origin.x,
                        y: f.origin.y,
                        width: f.width,
                        height: f.height,
                        interaction: f.interaction,
                        occupant: self.interactions.occupant_of(f.id),
                    })
                    .collect::<Vec<_>>(),
            ),
            None => (0, 0, Vec::new()),
        };
        furniture.sort_unstable_by_key(|f| f.id);

        WorldSnapshot {
            sim_time: self.sim_time,
            width,
            height,
            occupants,
            furniture,
        }
    }

    /// Copy of an occupant's current state (local or remote)
    pub fn occupant(&self, id: OccupantId) -> Option<Occupant> {
        let entity = *self.entities.get(&id)?;
        let occupant = self.world.get::<&Occupant>(entity).ok()?;
        Some((*occupant).clone())
    }

    pub fn position(&self, id: OccupantId) -> Option<Vec2> {
        self.occupant(id).map(|o| o.position)
    }

    /// Which occupant holds a furniture lock
    pub fn occupant_of(&self, furniture: FurnitureId) -> Option<OccupantId> {
        self.interactions.occupant_of(furniture)
    }

    /// Count all occupants, local and remote
    pub fn occupant_count(&self) -> usize {
        self.entities.len()
    }

    /// Count remote occupants
    pub fn remote_count(&self) -> usize {
        self.world.query::<&Remote>().iter().count()
    }

    pub fn collision(&self) -> Option<&CollisionIndex> {
        self.collision.as_ref()
    }

    pub fn map(&self) -> Option<&MapSnapshot> {
        self.map.as_ref()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Set time scale (1.0 = real-time, 2.0 = 2x speed, etc.)
    pub fn set_time_scale(&mut self, scale: f64) {
        self.config.time_scale = scale.max(0.0);
    }

    /// Get current time scale
    pub fn time_scale(&self) -> f64 {
        self.config.time_scale
    }

    /// Get current simulation time in seconds
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    fn local_entity(&self, id: OccupantId) -> Result<Entity, EngineError> {
        self.entities
            .get(&id)
            .copied()
            .filter(|&e| self.world.get::<&Local>(e).is_ok())
            .ok_or(EngineError::UnknownOccupant(id))
    }
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors returned by engine operations
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// No local occupant with this id.
    UnknownOccupant(OccupantId),
    /// An occupant with this id already exists.
    DuplicateOccupant(OccupantId),
    /// The operation needs a loaded map.
    NoMap,
    InvalidMap(Vec<MapError>),
    InvalidConfig(Vec<ConfigError>),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::UnknownOccupant(id) => write!(f, "Unknown occupant #{}", id),
            EngineError::DuplicateOccupant(id) => write!(f, "Occupant #{} already present", id),
            EngineError::NoMap => write!(f, "No map loaded"),
            EngineError::InvalidMap(errors) => write!(f, "Invalid map ({} errors)", errors.len()),
            EngineError::InvalidConfig(errors) => {
                write!(f, "Invalid config ({} errors)", errors.len())
            }
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::*;
    use tilespace_logic::map::{FurnitureSpec, FurnitureType};
    use tilespace_logic::movement::MovementStateKind;

    fn office() -> MapSnapshot {
        let mut map = MapSnapshot::from_rows(&[
            "........", //
            "........", //
            "........", //
            "........", //
            "........", //
            "........", //
        ]);
        map.furniture.push(
            FurnitureSpec::new(1, FurnitureType::Chair, GridPos::new(2, 2), 1, 1)
                .with_interaction(InteractionKind::Sit),
        );
        map.furniture.push(
            FurnitureSpec::new(2, FurnitureType::Computer, GridPos::new(6, 0), 1, 1)
                .with_interaction(InteractionKind::Use),
        );
        map.furniture.push(
            FurnitureSpec::new(3, FurnitureType::Chair, GridPos::new(6, 5), 1, 1)
                .with_interaction(InteractionKind::Sit),
        );
        map.furniture
            .push(FurnitureSpec::new(4, FurnitureType::Plant, GridPos::new(4, 3), 1, 1));
        map
    }

    fn engine() -> SimulationEngine {
        let mut engine = SimulationEngine::new();
        engine.load_map(office()).unwrap();
        engine
    }

    fn run_until_idle(engine: &mut SimulationEngine, id: OccupantId) {
        for _ in 0..200 {
            engine.update(0.05);
            if !engine.occupant(id).unwrap().is_walking() {
                return;
            }
        }
        panic!("occupant #{} never stopped walking", id);
    }

    #[test]
    fn test_engine_creation() {
        let engine = SimulationEngine::new();
        assert_eq!(engine.occupant_count(), 0);
        assert_eq!(engine.sim_time(), 0.0);
        assert!(engine.collision().is_none());
    }

    #[test]
    fn test_time_scale() {
        let mut engine = SimulationEngine::new();
        engine.set_time_scale(2.0);
        engine.update(1.0);
        assert!((engine.sim_time() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_config_and_map_are_refused() {
        let config = SimConfig {
            walk_speed: 0.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            SimulationEngine::with_config(config),
            Err(EngineError::InvalidConfig(_))
        ));

        let mut engine = SimulationEngine::new();
        let mut map = office();
        map.walkable.pop();
        assert!(matches!(engine.load_map(map), Err(EngineError::InvalidMap(_))));
        assert!(engine.map().is_none());
    }

    #[test]
    fn join_rejects_duplicates_and_moves_off_furniture() {
        let mut engine = engine();
        engine.join(1, "Ada", GridPos::new(2, 2)).unwrap();
        assert_eq!(
            engine.join(1, "Ada again", GridPos::new(0, 0)),
            Err(EngineError::DuplicateOccupant(1))
        );
        let cell = engine.occupant(1).unwrap().cell();
        assert_ne!(cell, GridPos::new(2, 2));
        assert!(engine.collision().unwrap().is_walkable(cell));
    }

    #[test]
    fn intents_apply_on_next_tick_only() {
        let mut engine = engine();
        engine.join(1, "Ada", GridPos::new(0, 0)).unwrap();
        engine.queue_click(1, GridPos::new(5, 0)).unwrap();
        assert_eq!(engine.pending_intents(), 1);
        assert!(!engine.occupant(1).unwrap().is_walking());

        let report = engine.update(0.0);
        assert_eq!(engine.pending_intents(), 0);
        assert_eq!(report.dropped_intents, 0);
        let occ = engine.occupant(1).unwrap();
        assert!(occ.is_walking());
        assert_eq!(occ.position, Vec2::new(0.0, 0.0));
    }

    #[test]
    fn click_on_chair_walks_and_sits() {
        let mut engine = engine();
        engine.join(1, "Ada", GridPos::new(0, 0)).unwrap();
        engine.queue_click(1, GridPos::new(2, 2)).unwrap();
        run_until_idle(&mut engine, 1);

        let occ = engine.occupant(1).unwrap();
        assert_eq!(occ.state, MovementState::Sitting { furniture: 1 });
        assert_eq!(occ.position, Vec2::new(2.0, 2.0));
        assert_eq!(engine.occupant_of(1), Some(1));

        // A second occupant is refused and stays idle beside the chair.
        engine.join(2, "Grace", GridPos::new(4, 0)).unwrap();
        engine.queue_click(2, GridPos::new(2, 2)).unwrap();
        let mut failed = Vec::new();
        for _ in 0..200 {
            let report = engine.update(0.05);
            failed.extend(report.failed);
            if !engine.occupant(2).unwrap().is_walking() {
                break;
            }
        }
        assert_eq!(failed.len(), 1);
        assert_eq!(engine.occupant(2).unwrap().state, MovementState::Idle);
        assert_eq!(engine.occupant_of(1), Some(1));
    }

    #[test]
    fn computer_use_times_out() {
        let mut engine = engine();
        engine.join(1, "Ada", GridPos::new(5, 0)).unwrap();
        engine.queue_click(1, GridPos::new(6, 0)).unwrap();
        run_until_idle(&mut engine, 1);
        assert!(matches!(
            engine.occupant(1).unwrap().state,
            MovementState::Using { furniture: 2, .. }
        ));

        let mut released = Vec::new();
        for _ in 0..70 {
            released.extend(engine.update(0.05).released);
        }
        assert_eq!(released, vec![(1, 2)]);
        assert_eq!(engine.occupant(1).unwrap().state, MovementState::Idle);
        assert_eq!(engine.occupant_of(2), None);
    }

    #[test]
    fn leaving_releases_locks() {
        let mut engine = engine();
        engine.join(1, "Ada", GridPos::new(1, 2)).unwrap();
        engine.queue_click(1, GridPos::new(2, 2)).unwrap();
        run_until_idle(&mut engine, 1);
        assert_eq!(engine.occupant_of(1), Some(1));

        assert_eq!(engine.leave(1), Ok(vec![1]));
        assert_eq!(engine.occupant_of(1), None);
        assert_eq!(engine.occupant_count(), 0);
        assert_eq!(engine.world.len(), 0);
        assert_eq!(engine.leave(1), Err(EngineError::UnknownOccupant(1)));
    }

    #[test]
    fn stop_leaves_furniture() {
        let mut engine = engine();
        engine.join(1, "Ada", GridPos::new(1, 2)).unwrap();
        engine.queue_click(1, GridPos::new(2, 2)).unwrap();
        run_until_idle(&mut engine, 1);
        engine.queue_stop(1).unwrap();
        let report = engine.update(0.05);
        assert_eq!(report.released, vec![(1, 1)]);
        assert_eq!(engine.occupant(1).unwrap().state, MovementState::Idle);
    }

    #[test]
    fn key_and_pointer_intents() {
        let mut engine = engine();
        engine.join(1, "Ada", GridPos::new(0, 0)).unwrap();
        assert_eq!(engine.queue_key(1, "x"), Ok(false));
        assert_eq!(engine.queue_key(1, "ArrowRight"), Ok(true));
        engine.update(0.0);
        assert_eq!(
            engine.occupant(1).unwrap().target_position(),
            Some(Vec2::new(1.0, 0.0))
        );

        // Default viewport: 32px tiles, no scale, no offset.
        engine.queue_pointer(1, 100.0, 40.0).unwrap();
        engine.update(0.0);
        assert_eq!(
            engine.occupant(1).unwrap().target_position(),
            Some(Vec2::new(3.0, 1.0))
        );
        assert_eq!(engine.queue_key(9, "w"), Err(EngineError::UnknownOccupant(9)));
    }

    #[test]
    fn hover_and_suggestions() {
        let mut engine = engine();
        assert_eq!(engine.hover(GridPos::new(2, 2)), vec![1]);
        assert!(engine.hover(GridPos::new(4, 3)).is_empty());

        engine.join(1, "Ada", GridPos::new(5, 5)).unwrap();
        engine.set_phase(1, ActivityPhase::ShortBreak).unwrap();
        let ids: Vec<_> = engine
            .suggestions(1)
            .unwrap()
            .iter()
            .map(|s| s.furniture)
            .collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(SimulationEngine::new().suggestions(1), Err(EngineError::NoMap));
    }

    #[test]
    fn map_rebuild_clears_locks() {
        let mut engine = engine();
        engine.join(1, "Ada", GridPos::new(1, 2)).unwrap();
        engine.queue_click(1, GridPos::new(2, 2)).unwrap();
        run_until_idle(&mut engine, 1);
        assert_eq!(engine.occupant_of(1), Some(1));

        engine.load_map(office()).unwrap();
        assert_eq!(engine.occupant_of(1), None);
        assert_eq!(engine.occupant(1).unwrap().state, MovementState::Idle);
    }

    #[test]
    fn presence_cadence_and_roster() {
        let mut engine = engine();
        engine.join(1, "Ada", GridPos::new(0, 0)).unwrap();

        let mut published = 0;
        for _ in 0..40 {
            if engine.update(0.1).presence_published {
                published += 1;
            }
        }
        assert!((3..=4).contains(&published), "published {} times", published);
        let updates = engine.drain_presence();
        assert_eq!(updates.len(), published);
        assert!(updates.iter().all(|u| u.id == 1));
        assert!(engine.drain_presence().is_empty());

        let roster = [RemoteOccupant {
            id: 40,
            name: "Remote".into(),
            position: Vec2::new(7.0, 5.0),
            target: None,
            facing: Facing::Left,
            state: MovementStateKind::Sitting,
            phase: ActivityPhase::LongBreak,
        }];
        assert_eq!(engine.apply_roster(&roster).spawned, vec![40]);
        assert_eq!(engine.remote_count(), 1);
        // Remote occupants cannot be commanded.
        assert_eq!(engine.queue_stop(40), Err(EngineError::UnknownOccupant(40)));

        let snapshot = engine.snapshot();
        let remote = snapshot.occupant(40).unwrap();
        assert!(remote.remote);
        assert_eq!(remote.state, MovementStateKind::Sitting);
        assert_eq!(snapshot.occupants.len(), 2);
        assert_eq!(snapshot.furniture.len(), 4);

        assert_eq!(engine.apply_roster(&[]).despawned, vec![40]);
        assert_eq!(engine.occupant_count(), 1);
    }

    #[test]
    fn intents_without_map_are_dropped() {
        let mut engine = SimulationEngine::new();
        engine.join(1, "Ada", GridPos::new(0, 0)).unwrap();
        engine.queue_click(1, GridPos::new(1, 0)).unwrap();
        assert_eq!(engine.update(0.1).dropped_intents, 1);
        assert_eq!(engine.pending_intents(), 0);
    }
}
