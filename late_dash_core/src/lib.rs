use serde::{Deserialize, Serialize};

pub mod config;
pub mod cost;
pub mod hazard;
pub mod heuristic;
pub mod level;
pub mod map;
pub mod search;
pub mod session;

/// Represents a grid coordinate as a `(row, col)` pair.
///
/// A position carries no validity guarantee on its own; whether it lies on
/// the map is always checked against a [`map::GridMap`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Position { row, col }
    }

    /// Returns the manhattan distance between two positions.
    pub fn manhattan(self, other: Position) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// Returns the position shifted by `(dr, dc)`.
    pub fn offset(self, dr: i32, dc: i32) -> Position {
        Position {
            row: self.row + dr,
            col: self.col + dc,
        }
    }

    /// True when the two positions share an edge (4-adjacency).
    pub fn is_adjacent(self, other: Position) -> bool {
        self.manhattan(other) == 1
    }

    /// True when the two positions touch only at a corner.
    pub fn is_diagonal_to(self, other: Position) -> bool {
        self.row.abs_diff(other.row) == 1 && self.col.abs_diff(other.col) == 1
    }
}

impl From<(i32, i32)> for Position {
    fn from((row, col): (i32, i32)) -> Self {
        Position { row, col }
    }
}

/// The actors that can occupy a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    /// The player-controlled mover heading for the goal.
    Mover,
    /// The patrolling hazard.
    Hazard,
}

/// Represents the content of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellKind {
    #[default]
    Empty,
    Wall,
    Actor(ActorKind),
    Goal,
    SpeedGadget,
    DoorGadget,
}

impl CellKind {
    /// Maps a level tag character to a cell kind.
    pub fn from_tag(tag: char) -> Option<CellKind> {
        match tag {
            '.' => Some(CellKind::Empty),
            '#' => Some(CellKind::Wall),
            'N' => Some(CellKind::Actor(ActorKind::Mover)),
            'S' => Some(CellKind::Goal),
            'G' => Some(CellKind::Actor(ActorKind::Hazard)),
            'B' => Some(CellKind::SpeedGadget),
            'D' => Some(CellKind::DoorGadget),
            _ => None,
        }
    }

    /// Inverse of [`CellKind::from_tag`].
    pub fn tag(self) -> char {
        match self {
            CellKind::Empty => '.',
            CellKind::Wall => '#',
            CellKind::Actor(ActorKind::Mover) => 'N',
            CellKind::Goal => 'S',
            CellKind::Actor(ActorKind::Hazard) => 'G',
            CellKind::SpeedGadget => 'B',
            CellKind::DoorGadget => 'D',
        }
    }

    pub fn is_gadget(self) -> bool {
        matches!(self, CellKind::SpeedGadget | CellKind::DoorGadget)
    }
}

/// One of the four cardinal step directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Fixed scan order used whenever every direction has to be tried.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Returns the `(dr, dc)` delta of one step.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    pub fn apply(self, position: Position) -> Position {
        let (dr, dc) = self.delta();
        position.offset(dr, dc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_is_symmetric() {
        let a = Position::new(5, 5);
        let b = Position::new(6, 8);
        assert_eq!(a.manhattan(b), 4);
        assert_eq!(b.manhattan(a), 4);
    }

    #[test]
    fn tags_round_trip_for_every_kind() {
        for tag in ['.', '#', 'N', 'S', 'G', 'B', 'D'] {
            let kind = CellKind::from_tag(tag).unwrap();
            assert_eq!(kind.tag(), tag);
        }
        assert_eq!(CellKind::from_tag('x'), None);
    }

    #[test]
    fn adjacency_excludes_diagonals() {
        let p = Position::new(2, 2);
        assert!(p.is_adjacent(Position::new(1, 2)));
        assert!(!p.is_adjacent(Position::new(1, 1)));
        assert!(p.is_diagonal_to(Position::new(1, 1)));
    }
}
