//! The patrolling/chasing hazard.
//!
//! The agent walks a cyclic patrol route, dwells at each waypoint, and
//! switches to chasing whenever the mover comes within range. Movement is
//! greedy and wall-aware: the agent never steps onto a cell the grid reports
//! as unwalkable.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{Direction, Position, config::EngineConfig, map::GridMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardMode {
    Patrol,
    Paused,
    Chase,
}

/// What happened during one call to [`HazardAgent::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HazardTick {
    pub from: Position,
    pub to: Position,
    pub mode: HazardMode,
}

impl HazardTick {
    pub fn moved(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Clone)]
pub struct HazardAgent {
    position: Position,
    waypoints: Vec<Position>,
    waypoint_index: usize,
    mode: HazardMode,
    chase_target: Option<Position>,
    pause_until: Option<f64>,
    speed: f64,
    chase_range: u32,
    pause_secs: f64,
    // Simulated time, advanced only by `update`.
    clock: f64,
    last_step_at: f64,
}

impl HazardAgent {
    /// Creates an agent patrolling `waypoints`; an empty route makes the
    /// start position its own one-stop loop.
    pub fn new(
        position: Position,
        waypoints: Vec<Position>,
        speed: f64,
        config: &EngineConfig,
    ) -> Self {
        debug_assert!(speed > 0.0, "hazard speed must be positive");
        let waypoints = if waypoints.is_empty() {
            vec![position]
        } else {
            waypoints
        };
        HazardAgent {
            position,
            waypoints,
            waypoint_index: 0,
            mode: HazardMode::Patrol,
            chase_target: None,
            pause_until: None,
            speed,
            chase_range: config.chase_range,
            pause_secs: config.hazard_pause_secs,
            clock: 0.0,
            last_step_at: 0.0,
        }
    }

    pub fn with_chase_range(mut self, chase_range: u32) -> Self {
        self.chase_range = chase_range;
        self
    }

    pub fn with_pause_secs(mut self, pause_secs: f64) -> Self {
        self.pause_secs = pause_secs;
        self
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn mode(&self) -> HazardMode {
        self.mode
    }

    pub fn chase_target(&self) -> Option<Position> {
        self.chase_target
    }

    pub fn waypoints(&self) -> &[Position] {
        &self.waypoints
    }

    pub fn current_waypoint(&self) -> Position {
        self.waypoints[self.waypoint_index]
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Advances the agent by `dt` seconds. Performs at most one cell step;
    /// time beyond a single step interval is dropped.
    pub fn update(&mut self, dt: f64, chase_target_hint: Position, grid: &GridMap) -> HazardTick {
        let from = self.position;
        self.clock += dt.max(0.0);

        self.update_mode(chase_target_hint);

        if self.mode == HazardMode::Paused {
            if self.pause_until.is_some_and(|deadline| self.clock >= deadline) {
                self.pause_until = None;
                self.waypoint_index = (self.waypoint_index + 1) % self.waypoints.len();
                self.set_mode(HazardMode::Patrol);
            }
            return self.tick(from);
        }

        if self.clock - self.last_step_at < 1.0 / self.speed {
            return self.tick(from);
        }
        self.last_step_at = self.clock;

        let target = match (self.mode, self.chase_target) {
            (HazardMode::Chase, Some(target)) => target,
            _ => self.current_waypoint(),
        };

        if self.position == target {
            if self.mode == HazardMode::Patrol {
                self.pause_until = Some(self.clock + self.pause_secs);
                self.set_mode(HazardMode::Paused);
            }
            return self.tick(from);
        }

        if let Some(next) = self.step_toward(target, grid) {
            self.position = next;
        }
        self.tick(from)
    }

    fn tick(&self, from: Position) -> HazardTick {
        HazardTick {
            from,
            to: self.position,
            mode: self.mode,
        }
    }

    /// Chase whenever the hint is within range, no hysteresis. Leaving chase
    /// resumes the patrol toward the same waypoint.
    fn update_mode(&mut self, hint: Position) {
        if self.position.manhattan(hint) <= self.chase_range {
            self.chase_target = Some(hint);
            self.pause_until = None;
            self.set_mode(HazardMode::Chase);
        } else {
            self.chase_target = None;
            if self.mode != HazardMode::Paused {
                self.set_mode(HazardMode::Patrol);
            }
        }
    }

    fn set_mode(&mut self, mode: HazardMode) {
        if self.mode != mode {
            debug!(
                "Hazard at ({}, {}) switches {:?} -> {:?}",
                self.position.row, self.position.col, self.mode, mode
            );
            self.mode = mode;
        }
    }

    /// Picks one walkable cardinal neighbour toward `target`, or `None` when
    /// boxed in.
    fn step_toward(&self, target: Position, grid: &GridMap) -> Option<Position> {
        let dr = target.row - self.position.row;
        let dc = target.col - self.position.col;

        let vertical = match dr.signum() {
            1 => Some(Direction::Down),
            -1 => Some(Direction::Up),
            _ => None,
        };
        let horizontal = match dc.signum() {
            1 => Some(Direction::Right),
            -1 => Some(Direction::Left),
            _ => None,
        };

        // Larger remaining delta first, vertical on ties
        let preferred = if dr.abs() >= dc.abs() {
            [vertical, horizontal]
        } else {
            [horizontal, vertical]
        };

        preferred
            .into_iter()
            .flatten()
            .chain(Direction::ALL)
            .map(|direction| direction.apply(self.position))
            .find(|&next| grid.is_walkable(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellKind;

    fn pos(row: i32, col: i32) -> Position {
        Position::new(row, col)
    }

    fn agent(position: Position, waypoints: Vec<Position>) -> HazardAgent {
        HazardAgent::new(position, waypoints, 1.0, &EngineConfig::default())
    }

    #[test]
    fn empty_route_patrols_its_start() {
        let hazard = agent(pos(2, 2), vec![]);
        assert_eq!(hazard.waypoints(), &[pos(2, 2)]);
        assert_eq!(hazard.mode(), HazardMode::Patrol);
    }

    #[test]
    fn chase_switches_on_at_exact_range() {
        let grid = GridMap::new(12, 12).unwrap();
        let mut hazard = agent(pos(5, 5), vec![pos(5, 5)]).with_chase_range(3);
        let tick = hazard.update(0.0, pos(6, 7), &grid);
        assert_eq!(tick.mode, HazardMode::Chase);
        assert_eq!(hazard.chase_target(), Some(pos(6, 7)));

        let tick = hazard.update(0.0, pos(6, 8), &grid);
        assert_ne!(tick.mode, HazardMode::Chase);
        assert_eq!(hazard.chase_target(), None);
    }

    #[test]
    fn steps_are_rate_limited_and_excess_time_dropped() {
        let grid = GridMap::new(1, 10).unwrap();
        let mut hazard = agent(pos(0, 0), vec![pos(0, 9)]).with_chase_range(0);
        assert!(!hazard.update(0.5, pos(0, 9), &grid).moved());
        let tick = hazard.update(0.5, pos(0, 9), &grid);
        assert_eq!(tick.to, pos(0, 1));
        // A huge frame still moves only one cell.
        let tick = hazard.update(10.0, pos(0, 9), &grid);
        assert_eq!(tick.to, pos(0, 2));
        assert!(!hazard.update(0.1, pos(0, 9), &grid).moved());
    }

    #[test]
    fn larger_delta_axis_goes_first() {
        let grid = GridMap::new(10, 10).unwrap();
        let mut hazard = agent(pos(0, 0), vec![pos(1, 5)]).with_chase_range(0);
        let tick = hazard.update(1.0, pos(9, 9), &grid);
        assert_eq!(tick.to, pos(0, 1));

        let mut hazard = agent(pos(0, 0), vec![pos(3, 3)]).with_chase_range(0);
        let tick = hazard.update(1.0, pos(9, 9), &grid);
        assert_eq!(tick.to, pos(1, 0));
    }

    #[test]
    fn blocked_axis_falls_back_to_the_other_then_to_a_scan() {
        let mut grid = GridMap::load(&["...", ".#.", "..."]).unwrap();
        // Target straight below, wall in the way: no horizontal delta, so the
        // scan picks Up (off grid), Down (wall), Left.
        let mut hazard = agent(pos(0, 1), vec![pos(2, 1)]).with_chase_range(0);
        assert_eq!(hazard.update(1.0, pos(9, 9), &grid).to, pos(0, 0));

        grid.set_cell(pos(0, 0), CellKind::Wall).unwrap();
        grid.set_cell(pos(0, 2), CellKind::Wall).unwrap();
        let mut boxed = agent(pos(0, 1), vec![pos(2, 1)]).with_chase_range(0);
        let tick = boxed.update(1.0, pos(9, 9), &grid);
        assert!(!tick.moved());
    }

    #[test]
    fn pauses_at_waypoint_then_advances() {
        let grid = GridMap::new(3, 3).unwrap();
        let mut hazard = agent(pos(0, 0), vec![pos(0, 0), pos(0, 2)])
            .with_chase_range(0)
            .with_pause_secs(2.0);
        let far = pos(50, 50);

        assert_eq!(hazard.update(1.0, far, &grid).mode, HazardMode::Paused);
        assert_eq!(hazard.update(1.0, far, &grid).mode, HazardMode::Paused);
        let tick = hazard.update(1.0, far, &grid);
        assert_eq!(tick.mode, HazardMode::Patrol);
        assert!(!tick.moved());
        assert_eq!(hazard.current_waypoint(), pos(0, 2));

        let tick = hazard.update(1.0, far, &grid);
        assert_eq!(tick.to, pos(0, 1));
    }

    #[test]
    fn chase_cancels_a_pause_and_reaching_the_target_does_not_pause() {
        let grid = GridMap::new(5, 5).unwrap();
        let mut hazard = agent(pos(0, 0), vec![pos(0, 0)]).with_chase_range(2);
        assert_eq!(hazard.update(1.0, pos(4, 4), &grid).mode, HazardMode::Paused);

        let tick = hazard.update(0.0, pos(0, 1), &grid);
        assert_eq!(tick.mode, HazardMode::Chase);
        let tick = hazard.update(1.0, pos(0, 1), &grid);
        assert_eq!(tick.to, pos(0, 1));
        let tick = hazard.update(1.0, pos(0, 1), &grid);
        assert_eq!(tick.mode, HazardMode::Chase);
        assert!(!tick.moved());
    }

    #[test]
    fn chase_scenario_moves_toward_the_hint() {
        let grid = GridMap::new(10, 10).unwrap();
        let mut hazard = agent(pos(5, 5), vec![pos(1, 1)]).with_chase_range(3);
        let tick = hazard.update(1.0, pos(6, 6), &grid);
        assert_eq!(tick.mode, HazardMode::Chase);
        assert_eq!(tick.to.manhattan(pos(6, 6)), 1);
        assert!(grid.is_walkable(tick.to));
    }
}
