//! Best-first search over the grid with door teleports and dynamic costs.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet},
};

use log::debug;

use crate::{
    Direction, Position,
    config::EngineConfig,
    cost::{CostModel, CostModifiers},
    heuristic::{DoorPairs, estimate},
    map::GridMap,
};

/// Reasons a search is refused before any work is done.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("Position ({}, {}) is outside the grid", position.row, position.col)]
    OutOfBounds { position: Position },
    #[error("Goal ({}, {}) is not walkable", position.row, position.col)]
    GoalBlocked { position: Position },
}

/// A successful search.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    /// Start to goal inclusive.
    pub path: Vec<Position>,
    pub total_cost: f64,
    /// Number of heap pops, stale entries included.
    pub expanded: usize,
    /// Every popped position; empty unless exploration was recorded.
    pub explored: HashSet<Position>,
}

impl PathResult {
    /// Number of moves along the path (teleport hops count as one).
    pub fn steps(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

/// Outcome of a structurally valid search. Exhausting the reachable area
/// without meeting the goal is a normal result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(PathResult),
    NotFound {
        expanded: usize,
        explored: HashSet<Position>,
    },
}

impl SearchOutcome {
    pub fn path(&self) -> Option<&PathResult> {
        match self {
            SearchOutcome::Found(result) => Some(result),
            SearchOutcome::NotFound { .. } => None,
        }
    }

    pub fn into_path(self) -> Option<PathResult> {
        match self {
            SearchOutcome::Found(result) => Some(result),
            SearchOutcome::NotFound { .. } => None,
        }
    }

    pub fn explored(&self) -> &HashSet<Position> {
        match self {
            SearchOutcome::Found(result) => &result.explored,
            SearchOutcome::NotFound { explored, .. } => explored,
        }
    }
}

// For priority queue
#[derive(Debug, Clone, Copy)]
struct Frontier {
    priority: f64,
    sequence: u64,
    position: Position,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior, FIFO among equal priorities
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

const DIAGONALS: [(i32, i32); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// The pathfinding engine. Holds the cost model, the global modifiers and
/// the registered door pairs; the grid and hazard position are supplied per
/// call and never mutated.
#[derive(Debug, Clone, Default)]
pub struct PathSearch {
    cost: CostModel,
    modifiers: CostModifiers,
    doors: DoorPairs,
    allow_diagonal: bool,
}

impl PathSearch {
    pub fn new(cost: CostModel) -> Self {
        PathSearch {
            cost,
            ..Default::default()
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        PathSearch {
            cost: CostModel::from_config(config),
            allow_diagonal: config.allow_diagonal,
            ..Default::default()
        }
    }

    pub fn set_speed_boost(&mut self, active: bool) {
        if active != self.modifiers.speed_boost_active {
            debug!("Search speed boost set to {}", active);
        }
        self.modifiers.speed_boost_active = active;
    }

    pub fn speed_boost_active(&self) -> bool {
        self.modifiers.speed_boost_active
    }

    /// Registers a teleport edge. Duplicates (either order) are ignored.
    pub fn add_door_pair(&mut self, a: Position, b: Position) -> bool {
        self.doors.add(a, b)
    }

    pub fn clear_door_pairs(&mut self) {
        self.doors.clear();
    }

    pub fn door_pairs(&self) -> &DoorPairs {
        &self.doors
    }

    pub fn set_allow_diagonal(&mut self, allow: bool) {
        self.allow_diagonal = allow;
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost
    }

    /// Gets walkable successors of `position` with their edge costs.
    fn successors(
        &self,
        grid: &GridMap,
        position: Position,
        hazard: Option<Position>,
    ) -> Vec<(Position, f64)> {
        let mut successors = Vec::with_capacity(9);

        let diagonals: &[(i32, i32)] = if self.allow_diagonal { &DIAGONALS } else { &[] };
        let steps = Direction::ALL
            .iter()
            .map(|direction| direction.delta())
            .chain(diagonals.iter().copied());

        for (dr, dc) in steps {
            let next = position.offset(dr, dc);
            if grid.is_walkable(next) {
                let cost = self.cost.edge_cost(position, next, hazard, self.modifiers);
                successors.push((next, cost));
            }
        }

        for partner in self.doors.partners_of(position) {
            if grid.is_walkable(partner) {
                successors.push((partner, self.cost.teleport_cost(self.modifiers)));
            }
        }

        successors
    }

    /// Searches for a path from `start` to `goal`.
    ///
    /// `hazard` is the hazard's position at call time and only feeds the
    /// proximity surcharge. Costs depend on it, so results should not be
    /// cached by start and goal alone.
    pub fn find_path(
        &self,
        grid: &GridMap,
        hazard: Option<Position>,
        start: Position,
        goal: Position,
        record_exploration: bool,
    ) -> Result<SearchOutcome, SearchError> {
        for position in [start, goal] {
            if !grid.in_bounds(position) {
                return Err(SearchError::OutOfBounds { position });
            }
        }
        if !grid.is_walkable(goal) {
            return Err(SearchError::GoalBlocked { position: goal });
        }

        let mut frontier = BinaryHeap::new();
        // Predecessor and the cost of the edge taken from it
        let mut came_from: HashMap<Position, (Position, f64)> = HashMap::new();
        let mut cost_so_far: HashMap<Position, f64> = HashMap::new();
        let mut explored = HashSet::new();
        let mut sequence: u64 = 0;
        let mut expanded = 0;

        frontier.push(Frontier {
            priority: 0.0,
            sequence,
            position: start,
        });
        cost_so_far.insert(start, 0.0);

        while let Some(Frontier {
            position: current, ..
        }) = frontier.pop()
        {
            expanded += 1;
            if record_exploration {
                explored.insert(current);
            }

            let current_cost = cost_so_far.get(&current).copied().unwrap_or(f64::INFINITY);

            if current == goal {
                let (path, total_cost) = reconstruct_path(&came_from, start, goal);
                debug!(
                    "Path found: {} steps, cost {:.2}, {} nodes expanded, boost {}",
                    path.len().saturating_sub(1),
                    total_cost,
                    expanded,
                    self.modifiers.speed_boost_active
                );
                return Ok(SearchOutcome::Found(PathResult {
                    path,
                    total_cost,
                    expanded,
                    explored,
                }));
            }

            for (next, edge_cost) in self.successors(grid, current, hazard) {
                let new_cost = current_cost + edge_cost;
                let improves = cost_so_far
                    .get(&next)
                    .is_none_or(|&known| new_cost < known);

                if improves {
                    cost_so_far.insert(next, new_cost);
                    sequence += 1;
                    frontier.push(Frontier {
                        priority: new_cost + estimate(next, goal, &self.doors),
                        sequence,
                        position: next,
                    });
                    came_from.insert(next, (current, edge_cost));
                }
            }
        }

        debug!("No path found after expanding {} nodes", expanded);
        Ok(SearchOutcome::NotFound { expanded, explored })
    }

    /// Prices an existing path with the current modifiers and the given
    /// hazard position. Consecutive door endpoints are charged as a hop; when
    /// they are also neighbours the cheaper of step and hop applies, as in
    /// the search.
    pub fn path_cost(&self, path: &[Position], hazard: Option<Position>) -> f64 {
        path.windows(2)
            .map(|pair| {
                let (from, to) = (pair[0], pair[1]);
                let hop = self
                    .doors
                    .connects(from, to)
                    .then(|| self.cost.teleport_cost(self.modifiers));
                let step = self
                    .is_step(from, to)
                    .then(|| self.cost.edge_cost(from, to, hazard, self.modifiers));
                match (step, hop) {
                    (Some(step), Some(hop)) => step.min(hop),
                    (Some(cost), None) | (None, Some(cost)) => cost,
                    (None, None) => self.cost.edge_cost(from, to, hazard, self.modifiers),
                }
            })
            .sum()
    }

    /// True when every consecutive pair is a legal move for this search.
    pub fn is_contiguous(&self, path: &[Position]) -> bool {
        path.windows(2)
            .all(|pair| self.is_step(pair[0], pair[1]) || self.doors.connects(pair[0], pair[1]))
    }

    fn is_step(&self, from: Position, to: Position) -> bool {
        from.is_adjacent(to) || (self.allow_diagonal && from.is_diagonal_to(to))
    }
}

/// Walks predecessor links back from the goal. The returned cost is the sum
/// of the edges actually on the path, accumulated from the start.
fn reconstruct_path(
    came_from: &HashMap<Position, (Position, f64)>,
    start: Position,
    goal: Position,
) -> (Vec<Position>, f64) {
    let mut path = vec![goal];
    let mut edge_costs = Vec::new();
    let mut current = goal;

    while current != start {
        match came_from.get(&current) {
            Some(&(previous, cost)) => {
                current = previous;
                path.push(current);
                edge_costs.push(cost);
            }
            None => break,
        }
    }

    path.reverse();
    let total_cost = edge_costs.iter().rev().sum();
    (path, total_cost)
}
