use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    Position,
    map::{GridError, GridMap},
};

const BUILTIN_LEVELS: [&str; 3] = [
    include_str!("../levels/level1.toml"),
    include_str!("../levels/level2.toml"),
    include_str!("../levels/level3.toml"),
];

#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("Failed to read level file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse level: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid level map: {0}")]
    Grid(#[from] GridError),
    #[error("Level has no mover start ('N')")]
    MissingMover,
    #[error("Level has no goal ('S')")]
    MissingGoal,
    #[error("Hazard speed must be positive, got {0}")]
    InvalidSpeed(f64),
}

/// Plain level description: map rows of cell tags plus the structured data
/// that does not fit in a tag grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    #[serde(default)]
    pub name: String,
    pub map: Vec<String>,
    pub max_moves: f64,
    /// Hazard cells per second; the engine configuration decides when unset.
    #[serde(default)]
    pub hazard_speed: Option<f64>,
    #[serde(default)]
    pub hazard_patrol: Vec<(i32, i32)>,
    #[serde(default)]
    pub door_pairs: Vec<((i32, i32), (i32, i32))>,
    /// Mover steps a collected boost lasts; `None` keeps it until toggled off.
    #[serde(default)]
    pub speed_boost_duration: Option<u32>,
}

impl LevelData {
    pub fn from_toml_str(source: &str) -> Result<Self, LevelError> {
        let level: LevelData = toml::from_str(source)?;
        let invalid_speed = level
            .hazard_speed
            .filter(|speed| !(speed.is_finite() && *speed > 0.0));
        if let Some(speed) = invalid_speed {
            return Err(LevelError::InvalidSpeed(speed));
        }
        Ok(level)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// One of the shipped levels, numbered from 1. Unknown numbers fall back
    /// to the first level.
    pub fn builtin(number: usize) -> Result<Self, LevelError> {
        let index = match number {
            1..=3 => number - 1,
            _ => 0,
        };
        Self::from_toml_str(BUILTIN_LEVELS[index])
    }

    pub fn builtin_count() -> usize {
        BUILTIN_LEVELS.len()
    }

    /// Decodes the map and checks that the mover and goal are present.
    pub fn grid(&self) -> Result<GridMap, LevelError> {
        let grid = GridMap::load(self.map.as_slice())?;
        if grid.mover().is_none() {
            return Err(LevelError::MissingMover);
        }
        if grid.goal().is_none() {
            return Err(LevelError::MissingGoal);
        }
        Ok(grid)
    }

    /// Patrol waypoints that lie on walkable terrain of `grid`; others are
    /// dropped with a warning.
    pub fn patrol(&self, grid: &GridMap) -> Vec<Position> {
        self.hazard_patrol
            .iter()
            .map(|&point| Position::from(point))
            .filter(|&point| {
                let usable = grid.in_bounds(point)
                    && grid.cell_at(point) != Some(crate::CellKind::Wall);
                if !usable {
                    warn!(
                        "Ignoring patrol waypoint ({}, {}) in level '{}'",
                        point.row, point.col, self.name
                    );
                }
                usable
            })
            .collect()
    }

    /// Door pairs whose endpoints are both inside `grid`; others are dropped
    /// with a warning.
    pub fn doors(&self, grid: &GridMap) -> Vec<(Position, Position)> {
        self.door_pairs
            .iter()
            .map(|&(a, b)| (Position::from(a), Position::from(b)))
            .filter(|&(a, b)| {
                let usable = grid.in_bounds(a) && grid.in_bounds(b) && a != b;
                if !usable {
                    warn!(
                        "Ignoring door pair ({}, {}) <-> ({}, {}) in level '{}'",
                        a.row, a.col, b.row, b.col, self.name
                    );
                }
                usable
            })
            .collect()
    }
}
