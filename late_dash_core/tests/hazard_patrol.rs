use late_dash_core::{
    ActorKind, CellKind, Position,
    config::EngineConfig,
    hazard::{HazardAgent, HazardMode},
    map::GridMap,
};
use proptest::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng};

fn pos(row: i32, col: i32) -> Position {
    Position::new(row, col)
}

fn random_position(rng: &mut StdRng, rows: usize, cols: usize) -> Position {
    pos(
        rng.random_range(0..rows as i32),
        rng.random_range(0..cols as i32),
    )
}

/// Random walls at roughly 30% density plus a hazard on a free cell.
fn random_maze(rng: &mut StdRng) -> (GridMap, Position) {
    let rows = rng.random_range(6..14);
    let cols = rng.random_range(6..14);
    let mut grid = GridMap::new(rows, cols).unwrap();
    for index in 0..rows * cols {
        if rng.random_bool(0.3) {
            let at = grid.position_of(index).unwrap();
            grid.set_cell(at, CellKind::Wall).unwrap();
        }
    }
    let start = random_position(rng, rows, cols);
    grid.set_cell(start, CellKind::Actor(ActorKind::Hazard)).unwrap();
    (grid, start)
}

#[test]
fn hazard_never_enters_walls_in_random_mazes() {
    for seed in 0..24 {
        let mut rng = StdRng::seed_from_u64(seed);
        let (mut grid, start) = random_maze(&mut rng);
        let waypoints = (0..3)
            .map(|_| random_position(&mut rng, grid.rows(), grid.cols()))
            .collect();
        let speed = rng.random_range(0.5..4.0);
        let mut hazard = HazardAgent::new(start, waypoints, speed, &EngineConfig::default())
            .with_pause_secs(0.3);

        let mut hint = random_position(&mut rng, grid.rows(), grid.cols());
        for _ in 0..400 {
            // The hint wanders so the agent flips between patrol and chase.
            if rng.random_bool(0.2) {
                hint = random_position(&mut rng, grid.rows(), grid.cols());
            }
            let dt = rng.random_range(0.0..1.0);
            let tick = hazard.update(dt, hint, &grid);

            assert_ne!(grid.cell_at(tick.to), Some(CellKind::Wall), "seed {}", seed);
            assert!(grid.in_bounds(tick.to), "seed {}", seed);
            if tick.moved() {
                assert!(tick.from.is_adjacent(tick.to), "seed {}: {:?}", seed, tick);
                assert!(grid.is_walkable(tick.to), "seed {}: {:?}", seed, tick);
                grid.move_actor(ActorKind::Hazard, tick.from, tick.to).unwrap();
            }
            assert_eq!(grid.hazard(), Some(hazard.position()));
        }
    }
}

#[test]
fn chase_scenario_closes_in_by_one_cell() {
    let grid = GridMap::new(10, 10).unwrap();
    let mut hazard = HazardAgent::new(pos(5, 5), vec![pos(0, 0)], 1.0, &EngineConfig::default())
        .with_chase_range(3);
    let tick = hazard.update(1.0, pos(6, 6), &grid);
    assert_eq!(tick.mode, HazardMode::Chase);
    assert_eq!(tick.to.manhattan(pos(6, 6)), 1);
}

#[test]
fn chase_reaches_a_stationary_target_on_open_ground() {
    let grid = GridMap::new(10, 10).unwrap();
    let target = pos(8, 2);
    let mut hazard = HazardAgent::new(pos(1, 7), vec![], 2.0, &EngineConfig::default())
        .with_chase_range(20);

    let mut distance = hazard.position().manhattan(target);
    while distance > 0 {
        let tick = hazard.update(0.5, target, &grid);
        assert_eq!(tick.mode, HazardMode::Chase);
        let now = tick.to.manhattan(target);
        assert_eq!(now + 1, distance);
        distance = now;
    }
    assert_eq!(hazard.position(), target);
}

#[test]
fn patrol_visits_waypoints_in_cyclic_order() {
    let grid = GridMap::new(6, 6).unwrap();
    let route = vec![pos(1, 1), pos(1, 4), pos(4, 4)];
    let mut hazard = HazardAgent::new(pos(1, 1), route.clone(), 1.0, &EngineConfig::default())
        .with_chase_range(0)
        .with_pause_secs(0.5);

    let far = pos(100, 100);
    let mut stops = Vec::new();
    let mut previous = hazard.mode();
    for _ in 0..200 {
        let tick = hazard.update(0.5, far, &grid);
        if tick.mode == HazardMode::Paused && previous != HazardMode::Paused {
            stops.push(tick.to);
        }
        previous = tick.mode;
        if stops.len() == 4 {
            break;
        }
    }
    assert_eq!(stops, vec![route[0], route[1], route[2], route[0]]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn chase_starts_exactly_within_range(
        at in (0i32..12, 0i32..12),
        hint in (0i32..12, 0i32..12),
        range in 0u32..10,
    ) {
        let grid = GridMap::new(12, 12).unwrap();
        let at = Position::from(at);
        let hint = Position::from(hint);
        let mut hazard = HazardAgent::new(at, vec![], 1.0, &EngineConfig::default())
            .with_chase_range(range);
        let tick = hazard.update(0.0, hint, &grid);
        prop_assert_eq!(tick.mode == HazardMode::Chase, at.manhattan(hint) <= range);
        prop_assert!(!tick.moved());
    }
}
