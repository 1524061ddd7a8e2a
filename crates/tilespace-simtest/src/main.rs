//! Tilespace Headless Simulation Harness
//!
//! Validates grid logic and the engine tick loop against a sample office map.
//! Runs entirely in-process: no renderer, no presence service.
//!
//! Usage:
//!   cargo run -p tilespace-simtest
//!   cargo run -p tilespace-simtest -- --verbose
//!   RUST_LOG=debug cargo run -p tilespace-simtest

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tilespace_core::engine::SimulationEngine;
use tilespace_core::loader;
use tilespace_core::systems::RemoteOccupant;
use tilespace_logic::collision::CollisionIndex;
use tilespace_logic::geometry::{GridPos, Vec2};
use tilespace_logic::interaction::InteractionSystem;
use tilespace_logic::map::{FurnitureSpec, FurnitureType, InteractionKind, MapSnapshot};
use tilespace_logic::movement::{
    ActivityPhase, Facing, MovementController, MovementState, MovementStateKind, Occupant,
};
use tilespace_logic::pathfinding::{has_line_of_sight, path_length, smooth_path, Pathfinder};
use tilespace_logic::OccupantId;

// ── Sample map (same JSON a client would ship) ──────────────────────────
const OFFICE_MAP_JSON: &str = include_str!("../../../data/office_map.json");

const SWEEP_SEED: u64 = 0x7115_5ACE;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn new(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

fn main() {
    env_logger::init();
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== Tilespace Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Sample map
    let map = match loader::map_from_json_str(OFFICE_MAP_JSON) {
        Ok(map) => map,
        Err(e) => {
            println!("  ✗ office_map_parse: {}", e);
            std::process::exit(1);
        }
    };
    results.extend(validate_office_map(&map, verbose));

    // 2. Reference scenarios
    results.extend(validate_scenarios(verbose));

    // 3. Randomized path sweeps
    results.extend(validate_path_sweeps(&map, verbose));

    // 4. Engine soak with random intents
    results.extend(validate_engine_soak(&map, verbose));

    // 5. Presence roster and publishing
    results.extend(validate_presence(&map, verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Office Map ───────────────────────────────────────────────────────

fn validate_office_map(map: &MapSnapshot, verbose: bool) -> Vec<TestResult> {
    println!("--- Office Map ---");
    let mut results = Vec::new();
    let index = CollisionIndex::build(map);

    results.push(TestResult::new(
        "map_dimensions",
        map.width == 20 && map.height == 12,
        format!("{}x{}", map.width, map.height),
    ));

    let interactive = map.furniture.iter().filter(|f| f.interactive).count();
    results.push(TestResult::new(
        "map_interactive_furniture",
        interactive >= 8,
        format!("{} of {} pieces interactive", interactive, map.furniture.len()),
    ));

    let covered: Vec<GridPos> = map.furniture.iter().flat_map(|f| f.cells()).collect();
    let leaking = covered.iter().filter(|c| index.is_walkable(**c)).count();
    results.push(TestResult::new(
        "map_footprints_blocked",
        leaking == 0,
        format!("{} footprint cells, {} walkable", covered.len(), leaking),
    ));

    // Every interactive piece reachable from the entrance corner
    let pathfinder = Pathfinder::default();
    let start = GridPos::new(1, 1);
    let mut unreachable = Vec::new();
    for f in map.furniture.iter().filter(|f| f.interactive) {
        let reachable = index.approach_cells(f).into_iter().any(|cell| {
            pathfinder
                .find_path(&index, start, cell)
                .is_some_and(|p| p.last() == Some(&cell))
        });
        if !reachable {
            unreachable.push(f.id);
        }
    }
    results.push(TestResult::new(
        "map_furniture_reachable",
        unreachable.is_empty(),
        if unreachable.is_empty() {
            "every interactive piece has a reachable approach cell".to_string()
        } else {
            format!("unreachable: {:?}", unreachable)
        },
    ));

    if verbose {
        println!("  {} walkable cells", index.walkable_count());
    }
    results
}

// ── 2. Reference Scenarios ──────────────────────────────────────────────

fn validate_scenarios(_verbose: bool) -> Vec<TestResult> {
    println!("--- Scenarios ---");
    let mut results = Vec::new();
    let pathfinder = Pathfinder::default();

    // A: open field smooths to one segment
    let open = CollisionIndex::build(&MapSnapshot::open(5, 5));
    let smoothed = pathfinder
        .find_path(&open, GridPos::new(0, 0), GridPos::new(4, 4))
        .map(|p| smooth_path(&open, &p));
    results.push(TestResult::new(
        "scenario_open_field",
        smoothed == Some(vec![GridPos::new(0, 0), GridPos::new(4, 4)]),
        format!("{:?}", smoothed),
    ));

    // B: single obstacle forces a detour
    let mut blocked = MapSnapshot::open(5, 5);
    blocked
        .furniture
        .push(FurnitureSpec::new(1, FurnitureType::Plant, GridPos::new(2, 2), 1, 1));
    let blocked = CollisionIndex::build(&blocked);
    let detour = pathfinder.find_path(&blocked, GridPos::new(0, 2), GridPos::new(4, 2));
    let length = detour.as_deref().map(path_length).unwrap_or(0.0);
    results.push(TestResult::new(
        "scenario_single_obstacle",
        length > 4.0,
        format!("detour length {:.3}", length),
    ));

    // C: continuous motion after one second
    let controller = MovementController::default();
    let field = CollisionIndex::build(&MapSnapshot::open(8, 8));
    let mut walker = Occupant::new(1, Vec2::new(0.0, 0.0));
    if let Some(cmd) = controller.resolve_click(&field, &walker, GridPos::new(5, 5), 0.0) {
        controller.process_command(&mut walker, &cmd);
    }
    controller.update(&field, &mut walker, 1.0);
    let expected = 3.0 / 2f32.sqrt();
    results.push(TestResult::new(
        "scenario_continuous_motion",
        (walker.position.x - expected).abs() < 0.01
            && (walker.position.y - expected).abs() < 0.01
            && walker.is_walking(),
        format!("({:.4}, {:.4})", walker.position.x, walker.position.y),
    ));

    // D: lock and conflict
    let mut lounge = MapSnapshot::open(5, 5);
    lounge.furniture.push(
        FurnitureSpec::new(10, FurnitureType::Chair, GridPos::new(2, 2), 1, 1)
            .with_interaction(InteractionKind::Sit),
    );
    let lounge = CollisionIndex::build(&lounge);
    let mut locks = InteractionSystem::default();
    let mut first = Occupant::new(1, Vec2::new(1.0, 2.0));
    let mut second = Occupant::new(2, Vec2::new(3.0, 2.0));
    let sat = locks.interact_by_id(&lounge, &mut first, 10, 0.0).is_ok();
    let refused = locks.interact_by_id(&lounge, &mut second, 10, 0.0);
    results.push(TestResult::new(
        "scenario_lock_and_conflict",
        sat && first.position == Vec2::new(2.0, 2.0)
            && first.state == MovementState::Sitting { furniture: 10 }
            && locks.occupant_of(10) == Some(1)
            && refused.is_err()
            && second.state == MovementState::Idle,
        match refused {
            Err(e) => e.reason(),
            Ok(_) => "second occupant was allowed to sit".into(),
        },
    ));

    // E: timed release
    let mut desk = MapSnapshot::open(5, 5);
    desk.furniture.push(
        FurnitureSpec::new(20, FurnitureType::Computer, GridPos::new(4, 0), 1, 1)
            .with_interaction(InteractionKind::Use),
    );
    let desk = CollisionIndex::build(&desk);
    let mut locks = InteractionSystem::default();
    let mut worker = Occupant::new(1, Vec2::new(3.0, 0.0));
    let started = locks.interact_by_id(&desk, &mut worker, 20, 0.0).is_ok();
    let held_before = locks.expire_due(&mut worker, 2.99).is_none();
    let released = locks.expire_due(&mut worker, 3.0) == Some(20);
    results.push(TestResult::new(
        "scenario_timed_release",
        started
            && held_before
            && released
            && worker.state == MovementState::Idle
            && locks.occupant_of(20).is_none(),
        "use → idle and unlocked after 3.0s",
    ));

    results
}

// ── 3. Path Sweeps ──────────────────────────────────────────────────────

fn random_walkable(rng: &mut StdRng, index: &CollisionIndex) -> GridPos {
    loop {
        let cell = GridPos::new(
            rng.gen_range(0..index.width()),
            rng.gen_range(0..index.height()),
        );
        if index.is_walkable(cell) {
            return cell;
        }
    }
}

fn validate_path_sweeps(map: &MapSnapshot, verbose: bool) -> Vec<TestResult> {
    println!("--- Path Sweeps ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(SWEEP_SEED);
    let index = CollisionIndex::build(map);
    let pathfinder = Pathfinder::default();

    let mut found = 0;
    let mut illegal_steps = 0;
    let mut bad_endpoints = 0;
    let mut bad_smoothing = 0;
    let mut saved = 0usize;

    for _ in 0..2_000 {
        let a = random_walkable(&mut rng, &index);
        let b = random_walkable(&mut rng, &index);
        let Some(path) = pathfinder.find_path(&index, a, b) else {
            continue;
        };
        found += 1;
        if path.first() != Some(&a) || path.last() != Some(&b) {
            bad_endpoints += 1;
        }
        illegal_steps += path
            .windows(2)
            .filter(|w| !index.can_step(w[0], w[1]))
            .count();

        let smoothed = smooth_path(&index, &path);
        let keeps_ends = smoothed.first() == path.first() && smoothed.last() == path.last();
        let visible = smoothed
            .windows(2)
            .all(|w| has_line_of_sight(&index, w[0], w[1]));
        if !keeps_ends || !visible {
            bad_smoothing += 1;
        }
        saved += path.len().saturating_sub(smoothed.len());
    }

    // The office is one connected floor, so every pair must route.
    results.push(TestResult::new(
        "sweep_all_pairs_route",
        found == 2_000,
        format!("{}/2000 routed", found),
    ));
    results.push(TestResult::new(
        "sweep_steps_legal",
        illegal_steps == 0 && bad_endpoints == 0,
        format!("{} illegal steps, {} bad endpoints", illegal_steps, bad_endpoints),
    ));
    results.push(TestResult::new(
        "sweep_smoothing_visible",
        bad_smoothing == 0,
        format!("{} bad smoothings, {} waypoints removed", bad_smoothing, saved),
    ));

    // Random obstacle fields: footprints never walkable, cap respected
    let mut leaks = 0;
    let mut capped_found = 0;
    for _ in 0..200 {
        let mut field = MapSnapshot::open(24, 16);
        for _ in 0..60 {
            let cell = GridPos::new(rng.gen_range(0..24), rng.gen_range(0..16));
            field.set_walkable(cell, false);
        }
        for id in 0..8 {
            let origin = GridPos::new(rng.gen_range(0..21), rng.gen_range(0..14));
            field.furniture.push(FurnitureSpec::new(
                id,
                FurnitureType::Table,
                origin,
                rng.gen_range(1..=3),
                rng.gen_range(1..=2),
            ));
        }
        let index = CollisionIndex::build(&field);
        leaks += field
            .furniture
            .iter()
            .flat_map(|f| f.cells())
            .filter(|c| index.is_walkable(*c))
            .count();

        let tight = Pathfinder::new(5, 5);
        let a = random_walkable(&mut rng, &index);
        let b = random_walkable(&mut rng, &index);
        if a != b && tight.find_path(&index, a, b).is_some_and(|p| p.len() > 8) {
            capped_found += 1;
        }
    }
    results.push(TestResult::new(
        "sweep_footprints_blocked",
        leaks == 0,
        format!("{} leaking footprint cells over 200 maps", leaks),
    ));
    results.push(TestResult::new(
        "sweep_expansion_cap",
        capped_found == 0,
        format!("{} long routes found under a 5-expansion cap", capped_found),
    ));

    if verbose {
        println!("  {} random routes checked", found);
    }
    results
}

// ── 4. Engine Soak ──────────────────────────────────────────────────────

fn validate_engine_soak(map: &MapSnapshot, verbose: bool) -> Vec<TestResult> {
    println!("--- Engine Soak ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(SWEEP_SEED ^ 0xE5);
    let mut engine = SimulationEngine::new();

    if let Err(e) = engine.load_map(map.clone()) {
        results.push(TestResult::new("soak_map_load", false, e.to_string()));
        return results;
    }
    let Some(index) = engine.collision().cloned() else {
        results.push(TestResult::new("soak_map_load", false, "no collision index"));
        return results;
    };

    let ids: Vec<OccupantId> = (1..=8).collect();
    for &id in &ids {
        let cell = random_walkable(&mut rng, &index);
        if let Err(e) = engine.join(id, format!("worker-{}", id), cell) {
            results.push(TestResult::new("soak_join", false, e.to_string()));
            return results;
        }
    }

    let phases = [
        ActivityPhase::Focus,
        ActivityPhase::ShortBreak,
        ActivityPhase::LongBreak,
        ActivityPhase::Offline,
    ];
    let mut double_locks = 0;
    let mut stale_locks = 0;
    let mut wall_entries = 0;
    let mut started = 0;
    let mut refused = 0;
    let mut dropped = 0;
    let mut blocked = Vec::new();
    let mut previous: HashMap<OccupantId, Occupant> = HashMap::new();

    for _tick in 0..6_000 {
        for &id in &ids {
            let roll: f32 = rng.gen();
            let _ = if roll < 0.01 {
                engine.queue_click(id, random_walkable(&mut rng, &index))
            } else if roll < 0.02 {
                let f = &map.furniture[rng.gen_range(0..map.furniture.len())];
                engine.queue_click(id, f.origin)
            } else if roll < 0.022 {
                engine.queue_stop(id)
            } else if roll < 0.025 {
                let key = ["w", "a", "s", "d"][rng.gen_range(0..4)];
                engine.queue_key(id, key).map(|_| ())
            } else if roll < 0.026 {
                engine.set_phase(id, phases[rng.gen_range(0..phases.len())])
            } else {
                Ok(())
            };
        }

        let report = engine.update(1.0 / 30.0);
        started += report.started.len();
        refused += report.failed.len();
        dropped += report.dropped_intents;
        blocked.extend(report.blocked.iter().copied());

        let mut holders: HashMap<u32, OccupantId> = HashMap::new();
        for &id in &ids {
            let Some(occ) = engine.occupant(id) else { continue };
            if let Some(f) = occ.held_furniture() {
                if holders.insert(f, id).is_some() {
                    double_locks += 1;
                }
                if engine.occupant_of(f) != Some(id) {
                    stale_locks += 1;
                }
            }
            if let Some(prev) = previous.get(&id) {
                let moved_by_walking = prev.is_walking()
                    && matches!(occ.state, MovementState::Walking { .. } | MovementState::Idle);
                if moved_by_walking && occ.cell() != prev.cell() && !index.is_walkable(occ.cell()) {
                    wall_entries += 1;
                }
            }
            previous.insert(id, occ);
        }
    }

    results.push(TestResult::new(
        "soak_exclusive_occupancy",
        double_locks == 0 && stale_locks == 0,
        format!("{} double locks, {} stale locks", double_locks, stale_locks),
    ));
    results.push(TestResult::new(
        "soak_walkers_stay_on_floor",
        wall_entries == 0,
        format!("{} walks into solid cells", wall_entries),
    ));
    results.push(TestResult::new(
        "soak_planned_routes_arrive",
        blocked.is_empty(),
        format!(
            "{} planned walks stopped short, first {:?}",
            blocked.len(),
            blocked.first()
        ),
    ));
    results.push(TestResult::new(
        "soak_interactions_happen",
        started > 0,
        format!(
            "{} interactions started, {} refused, {} intents dropped",
            started, refused, dropped
        ),
    ));

    // Leaving releases every lock
    for &id in &ids {
        let _ = engine.leave(id);
    }
    let leftover = map
        .furniture
        .iter()
        .filter(|f| engine.occupant_of(f.id).is_some())
        .count();
    results.push(TestResult::new(
        "soak_leave_releases",
        leftover == 0 && engine.occupant_count() == 0,
        format!("{} locks left after everyone left", leftover),
    ));

    if verbose {
        println!("  simulated {:.1}s", engine.sim_time());
    }
    results
}

// ── 5. Presence ─────────────────────────────────────────────────────────

fn validate_presence(map: &MapSnapshot, _verbose: bool) -> Vec<TestResult> {
    println!("--- Presence ---");
    let mut results = Vec::new();
    let mut engine = SimulationEngine::new();
    if engine.load_map(map.clone()).is_err() || engine.join(1, "local", GridPos::new(1, 1)).is_err()
    {
        results.push(TestResult::new("presence_setup", false, "setup failed"));
        return results;
    }

    for _ in 0..300 {
        engine.update(1.0 / 30.0);
    }
    let published = engine.drain_presence();
    results.push(TestResult::new(
        "presence_cadence",
        (9..=10).contains(&published.len()),
        format!("{} updates over 10s", published.len()),
    ));

    let roster = vec![
        RemoteOccupant {
            id: 100,
            name: "remote-a".into(),
            position: Vec2::new(11.0, 4.0),
            target: Some(Vec2::new(17.0, 4.0)),
            facing: Facing::Right,
            state: MovementStateKind::Walking,
            phase: ActivityPhase::Focus,
        },
        RemoteOccupant {
            id: 101,
            name: "remote-b".into(),
            position: Vec2::new(13.0, 2.0),
            target: None,
            facing: Facing::Down,
            state: MovementStateKind::Sitting,
            phase: ActivityPhase::ShortBreak,
        },
    ];
    let changes = engine.apply_roster(&roster);
    for _ in 0..90 {
        engine.update(1.0 / 30.0);
    }
    let arrived = engine.position(100) == Some(Vec2::new(17.0, 4.0));
    // Remote occupants never lock furniture.
    let sofa_free = engine.occupant_of(7).is_none();
    results.push(TestResult::new(
        "presence_roster_spawn",
        changes.spawned == vec![100, 101] && arrived && sofa_free,
        format!("spawned {:?}, remote-a at {:?}", changes.spawned, engine.position(100)),
    ));

    let changes = engine.apply_roster(&roster[..1]);
    results.push(TestResult::new(
        "presence_roster_despawn",
        changes.despawned == vec![101] && engine.remote_count() == 1,
        format!("despawned {:?}", changes.despawned),
    ));

    let snapshot = engine.snapshot();
    let json_ok = snapshot
        .to_json()
        .ok()
        .and_then(|j| serde_json::from_str::<serde_json::Value>(&j).ok())
        .and_then(|v| v["occupants"].as_array().cloned())
        .map(|occupants| {
            occupants
                .iter()
                .filter(|o| o["remote"] == serde_json::Value::Bool(true))
                .count()
                == 1
        })
        .unwrap_or(false);
    results.push(TestResult::new(
        "presence_snapshot",
        snapshot.occupants.len() == 2 && json_ok,
        format!("{} occupants in snapshot", snapshot.occupants.len()),
    ));

    results
}
