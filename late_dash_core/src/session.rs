//! One playthrough of a level: the mover, the hazard, the move budget and
//! the win/loss rules, wired around the grid and the path search.
//!
//! The session never replans on its own. After the hazard moves, a stored
//! path may be stale until [`Session::plan`] is called again.

use std::collections::HashSet;

use log::{info, warn};

use crate::{
    ActorKind, CellKind, Direction, Position,
    config::EngineConfig,
    cost::{SpeedBoost, apply_step_to_modifier},
    hazard::{HazardAgent, HazardTick},
    heuristic::DoorPairs,
    level::{LevelData, LevelError},
    map::{GridError, GridMap},
    search::{PathSearch, SearchError, SearchOutcome},
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Collect the speed gadget before toggling the boost")]
    BoostUnavailable,
    #[error("The level is already over")]
    Finished,
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Grid(#[from] GridError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossReason {
    OutOfMoves,
    Caught,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Playing,
    Won,
    Lost(LossReason),
}

/// Result of trying to move the mover one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Moved { to: Position, teleported: bool },
    Blocked,
    Won,
    Lost(LossReason),
}

/// Everything that changed during one [`Session::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub hazard: Option<HazardTick>,
    pub mover: Option<StepOutcome>,
}

#[derive(Debug, Clone)]
pub struct Session {
    level: LevelData,
    config: EngineConfig,
    grid: GridMap,
    search: PathSearch,
    hazard: Option<HazardAgent>,
    mover: Position,
    goal: Position,
    speed_gadget_collected: bool,
    boost: SpeedBoost,
    moves_spent: f64,
    status: SessionStatus,
    path: Vec<Position>,
    path_index: usize,
    explored: HashSet<Position>,
    auto_moving: bool,
    move_timer: f64,
}

impl Session {
    pub fn new(level: LevelData, config: EngineConfig) -> Result<Self, LevelError> {
        let grid = level.grid()?;
        let mover = grid.mover().ok_or(LevelError::MissingMover)?;
        let goal = grid.goal().ok_or(LevelError::MissingGoal)?;

        let mut search = PathSearch::from_config(&config);
        for (a, b) in level.doors(&grid) {
            search.add_door_pair(a, b);
        }

        let hazard = grid.hazard().map(|position| {
            let speed = level.hazard_speed.unwrap_or(config.hazard_speed);
            HazardAgent::new(position, level.patrol(&grid), speed, &config)
        });

        info!(
            "Loaded level '{}' ({}x{}), {} door pair(s), hazard: {}",
            level.name,
            grid.rows(),
            grid.cols(),
            search.door_pairs().len(),
            hazard.is_some()
        );

        Ok(Session {
            level,
            config,
            grid,
            search,
            hazard,
            mover,
            goal,
            speed_gadget_collected: false,
            boost: SpeedBoost::default(),
            moves_spent: 0.0,
            status: SessionStatus::Playing,
            path: Vec::new(),
            path_index: 0,
            explored: HashSet::new(),
            auto_moving: false,
            move_timer: 0.0,
        })
    }

    /// Restarts the same level from scratch.
    pub fn reset(&mut self) -> Result<(), LevelError> {
        *self = Session::new(self.level.clone(), self.config.clone())?;
        Ok(())
    }

    fn ensure_playing(&self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::Playing => Ok(()),
            _ => Err(SessionError::Finished),
        }
    }

    /// Plans from the mover to the goal with the current hazard position and
    /// boost. A found path replaces the stored one; otherwise it is cleared.
    pub fn plan(&mut self) -> Result<SearchOutcome, SessionError> {
        self.ensure_playing()?;
        self.auto_moving = false;
        let hazard = self.hazard.as_ref().map(HazardAgent::position);
        let outcome = self
            .search
            .find_path(&self.grid, hazard, self.mover, self.goal, true)?;

        self.explored = outcome.explored().clone();
        match outcome.path() {
            Some(result) => {
                info!(
                    "Planned {} steps costing {:.1} moves",
                    result.steps(),
                    result.total_cost
                );
                self.path = result.path.clone();
            }
            None => {
                info!("No path to the goal");
                self.path.clear();
            }
        }
        self.path_index = 0;
        Ok(outcome)
    }

    /// Switches the boost on or off; returns whether it is now active.
    ///
    /// A stored path is replanned under the new costs. If that replan is
    /// refused the path is dropped, the toggle itself still stands.
    pub fn toggle_speed_boost(&mut self) -> Result<bool, SessionError> {
        self.ensure_playing()?;
        if !self.speed_gadget_collected {
            return Err(SessionError::BoostUnavailable);
        }
        self.boost = if self.boost.active {
            SpeedBoost::default()
        } else {
            SpeedBoost::activated(self.level.speed_boost_duration)
        };
        self.search.set_speed_boost(self.boost.active);
        info!("Speed boost {}", if self.boost.active { "on" } else { "off" });

        if !self.path.is_empty() && !self.auto_moving {
            if let Err(err) = self.plan() {
                warn!("Dropping the stored path, replan failed: {}", err);
                self.clear_path();
            }
        }
        Ok(self.boost.active)
    }

    /// Starts following the stored path, one step per `mover_step_secs`.
    pub fn start_auto_move(&mut self) -> bool {
        if self.status != SessionStatus::Playing || self.path.len() < 2 || self.auto_moving {
            return false;
        }
        self.auto_moving = true;
        self.path_index = 1;
        self.move_timer = 0.0;
        true
    }

    /// A manual step. Walking straight into the hazard gets the mover caught.
    pub fn step(&mut self, direction: Direction) -> Result<StepOutcome, SessionError> {
        self.ensure_playing()?;
        let target = direction.apply(self.mover);
        let hazard_at = self.hazard.as_ref().map(HazardAgent::position);
        if hazard_at == Some(target) {
            info!("Walked into the hazard");
            self.status = SessionStatus::Lost(LossReason::Caught);
            self.auto_moving = false;
            return Ok(StepOutcome::Lost(LossReason::Caught));
        }
        self.move_mover(target)
    }

    fn can_reach_in_one_move(&self, target: Position) -> bool {
        self.mover.is_adjacent(target)
            || (self.config.allow_diagonal && self.mover.is_diagonal_to(target))
            || self.search.door_pairs().connects(self.mover, target)
    }

    /// Moves the mover onto `target`, charging the move budget. Stepping on a
    /// door endpoint teleports to its partner for one more move. The hazard's
    /// cell is not walkable, so a move onto it is `Blocked`.
    pub fn move_mover(&mut self, target: Position) -> Result<StepOutcome, SessionError> {
        self.ensure_playing()?;
        if !self.grid.is_walkable(target) || !self.can_reach_in_one_move(target) {
            return Ok(StepOutcome::Blocked);
        }

        let move_cost = self.move_cost(target);
        if self.moves_spent + move_cost > self.level.max_moves {
            info!("Out of moves");
            self.status = SessionStatus::Lost(LossReason::OutOfMoves);
            self.auto_moving = false;
            return Ok(StepOutcome::Lost(LossReason::OutOfMoves));
        }

        let picked_up_boost = self.grid.cell_at(target) == Some(CellKind::SpeedGadget);
        if picked_up_boost {
            self.grid.set_cell(target, CellKind::Empty)?;
        }
        self.relocate_mover(target)?;
        self.moves_spent += move_cost;
        self.consume_boost_step();

        if picked_up_boost && !self.speed_gadget_collected {
            info!("Speed gadget collected");
            self.speed_gadget_collected = true;
        }

        let destination = self
            .search
            .door_pairs()
            .partners_of(target)
            .find(|&partner| self.grid.is_walkable(partner));
        let teleported = match destination {
            Some(destination) if self.mover != self.goal => {
                info!(
                    "Teleported ({}, {}) -> ({}, {})",
                    target.row, target.col, destination.row, destination.col
                );
                self.relocate_mover(destination)?;
                self.moves_spent += self.search.cost_model().teleport_cost(self.boost.modifiers());
                true
            }
            _ => false,
        };

        if self.mover == self.goal {
            info!("Goal reached in {:.1} moves", self.moves_spent);
            self.status = SessionStatus::Won;
            self.auto_moving = false;
            return Ok(StepOutcome::Won);
        }

        Ok(StepOutcome::Moved {
            to: self.mover,
            teleported,
        })
    }

    /// Budget charged for one move: a step is priced like a search edge
    /// without the hazard surcharge, a door hop like a teleport.
    fn move_cost(&self, target: Position) -> f64 {
        let cost = self.search.cost_model();
        let modifiers = self.boost.modifiers();
        let is_step = self.mover.is_adjacent(target)
            || (self.config.allow_diagonal && self.mover.is_diagonal_to(target));
        if is_step {
            cost.edge_cost(self.mover, target, None, modifiers)
        } else {
            cost.teleport_cost(modifiers)
        }
    }

    fn relocate_mover(&mut self, to: Position) -> Result<(), GridError> {
        self.grid.move_actor(ActorKind::Mover, self.mover, to)?;
        self.mover = to;
        Ok(())
    }

    fn consume_boost_step(&mut self) {
        self.boost = apply_step_to_modifier(self.boost);
        if self.search.speed_boost_active() != self.boost.active {
            info!("Speed boost expired");
            self.search.set_speed_boost(self.boost.active);
        }
    }

    /// Advances the hazard and, when auto-moving, the mover.
    pub fn tick(&mut self, dt: f64) -> Result<TickReport, SessionError> {
        let mut report = TickReport::default();
        if self.status != SessionStatus::Playing {
            return Ok(report);
        }

        if let Some(hazard) = self.hazard.as_mut() {
            let tick = hazard.update(dt, self.mover, &self.grid);
            if tick.moved() {
                self.grid.move_actor(ActorKind::Hazard, tick.from, tick.to)?;
                if tick.to == self.mover {
                    info!("Caught by the hazard");
                    self.status = SessionStatus::Lost(LossReason::Caught);
                    self.auto_moving = false;
                }
            }
            report.hazard = Some(tick);
        }

        if self.auto_moving && self.status == SessionStatus::Playing {
            self.move_timer += dt;
            if self.move_timer >= self.config.mover_step_secs {
                self.move_timer = 0.0;
                report.mover = Some(self.advance_along_path()?);
            }
        }

        Ok(report)
    }

    fn advance_along_path(&mut self) -> Result<StepOutcome, SessionError> {
        // A teleport already carried the mover onto the next entry.
        while self.path.get(self.path_index) == Some(&self.mover) {
            self.path_index += 1;
        }

        let Some(&next) = self.path.get(self.path_index) else {
            self.auto_moving = false;
            self.clear_path();
            return Ok(StepOutcome::Blocked);
        };

        let outcome = self.move_mover(next)?;
        match outcome {
            StepOutcome::Moved { .. } => self.path_index += 1,
            StepOutcome::Blocked => {
                self.auto_moving = false;
                self.clear_path();
            }
            StepOutcome::Won | StepOutcome::Lost(_) => self.auto_moving = false,
        }
        Ok(outcome)
    }

    pub fn clear_path(&mut self) {
        self.path.clear();
        self.explored.clear();
        self.path_index = 0;
    }

    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    pub fn hazard(&self) -> Option<&HazardAgent> {
        self.hazard.as_ref()
    }

    pub fn mover(&self) -> Position {
        self.mover
    }

    pub fn goal(&self) -> Position {
        self.goal
    }

    pub fn path(&self) -> &[Position] {
        &self.path
    }

    /// Index of the next path entry the mover will head for.
    pub fn path_index(&self) -> usize {
        self.path_index
    }

    pub fn explored(&self) -> &HashSet<Position> {
        &self.explored
    }

    pub fn moves_spent(&self) -> f64 {
        self.moves_spent
    }

    pub fn max_moves(&self) -> f64 {
        self.level.max_moves
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_auto_moving(&self) -> bool {
        self.auto_moving
    }

    pub fn speed_boost(&self) -> SpeedBoost {
        self.boost
    }

    pub fn speed_gadget_collected(&self) -> bool {
        self.speed_gadget_collected
    }

    pub fn door_pairs(&self) -> &DoorPairs {
        self.search.door_pairs()
    }

    pub fn level(&self) -> &LevelData {
        &self.level
    }
}
