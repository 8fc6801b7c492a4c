//! Distance estimate used to order the search, aware of door shortcuts.
//!
//! The estimate prices every remaining step at 1 regardless of the cost
//! modifiers in effect, so it is **not strictly admissible**: with the speed
//! boost active a step costs 0.5, and a diagonal step covers two cells of
//! Manhattan distance for sqrt(2), so the estimate can exceed the true
//! remaining cost. The hazard surcharge only raises costs and keeps the
//! estimate a lower bound. Returned paths are guaranteed optimal only with
//! the boost off and diagonals disabled.

use log::info;
use serde::{Deserialize, Serialize};

use crate::Position;

/// A bidirectional teleport edge. Order of the endpoints is irrelevant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DoorPair {
    pub a: Position,
    pub b: Position,
}

impl DoorPair {
    pub fn new(a: Position, b: Position) -> Self {
        DoorPair { a, b }
    }

    /// Returns the other endpoint when `position` is one of the two.
    pub fn partner_of(&self, position: Position) -> Option<Position> {
        if position == self.a {
            Some(self.b)
        } else if position == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    /// True when both pairs join the same two positions.
    pub fn links(&self, a: Position, b: Position) -> bool {
        (self.a == a && self.b == b) || (self.a == b && self.b == a)
    }
}

impl PartialEq for DoorPair {
    fn eq(&self, other: &Self) -> bool {
        self.links(other.a, other.b)
    }
}

impl Eq for DoorPair {}

/// Registry of door pairs; each pair is stored at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoorPairs {
    pairs: Vec<DoorPair>,
}

impl DoorPairs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pair. Returns `false` when it (or its reverse) is already
    /// known, in which case nothing changes.
    pub fn add(&mut self, a: Position, b: Position) -> bool {
        if self.pairs.iter().any(|pair| pair.links(a, b)) {
            return false;
        }
        info!(
            "Door pair added: ({}, {}) <-> ({}, {})",
            a.row, a.col, b.row, b.col
        );
        self.pairs.push(DoorPair::new(a, b));
        true
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DoorPair> {
        self.pairs.iter()
    }

    /// Every endpoint reachable by one teleport hop from `position`.
    pub fn partners_of(&self, position: Position) -> impl Iterator<Item = Position> + '_ {
        self.pairs
            .iter()
            .filter_map(move |pair| pair.partner_of(position))
    }

    /// True when `a` and `b` are the two ends of a registered pair.
    pub fn connects(&self, a: Position, b: Position) -> bool {
        self.pairs.iter().any(|pair| pair.links(a, b))
    }
}

/// Manhattan distance to the goal, shortened by any door pair that would
/// make the trip cheaper (one extra step for the hop itself).
pub fn estimate(position: Position, goal: Position, doors: &DoorPairs) -> f64 {
    let base = position.manhattan(goal);
    let best = doors.iter().fold(base, |best, pair| {
        let via_a = position.manhattan(pair.a) + pair.b.manhattan(goal) + 1;
        let via_b = position.manhattan(pair.b) + pair.a.manhattan(goal) + 1;
        best.min(via_a).min(via_b)
    });
    f64::from(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(row: i32, col: i32) -> Position {
        Position::new(row, col)
    }

    #[test]
    fn without_doors_estimate_is_manhattan() {
        assert_eq!(estimate(pos(0, 0), pos(4, 4), &DoorPairs::new()), 8.0);
    }

    #[test]
    fn door_shortcut_lowers_the_estimate() {
        let mut doors = DoorPairs::new();
        doors.add(pos(0, 1), pos(9, 9));
        // 1 to the door + 1 hop + 0 from the far door
        assert_eq!(estimate(pos(0, 0), pos(9, 9), &doors), 2.0);
    }

    #[test]
    fn reversed_duplicate_is_not_registered() {
        let mut doors = DoorPairs::new();
        assert!(doors.add(pos(1, 1), pos(3, 3)));
        assert!(!doors.add(pos(3, 3), pos(1, 1)));
        assert!(!doors.add(pos(1, 1), pos(3, 3)));
        assert_eq!(doors.len(), 1);
        assert!(doors.connects(pos(3, 3), pos(1, 1)));
    }

    #[test]
    fn partners_are_found_from_either_end() {
        let mut doors = DoorPairs::new();
        doors.add(pos(1, 1), pos(3, 3));
        doors.add(pos(1, 1), pos(0, 4));
        let partners: Vec<_> = doors.partners_of(pos(1, 1)).collect();
        assert_eq!(partners, vec![pos(3, 3), pos(0, 4)]);
        assert_eq!(doors.partners_of(pos(3, 3)).collect::<Vec<_>>(), vec![pos(1, 1)]);
        assert_eq!(doors.partners_of(pos(2, 2)).count(), 0);
    }
}
