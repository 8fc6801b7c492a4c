use std::{
    collections::HashMap,
    ops::{Index, IndexMut},
};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{ActorKind, CellKind, Position};

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Position ({}, {}) is out of bounds for grid size ({rows}, {cols})", position.row, position.col)]
    OutOfBounds {
        position: Position,
        rows: usize,
        cols: usize,
    },
    #[error("Grid must have at least one row and one column")]
    EmptyGrid,
    #[error("Grid size ({rows}, {cols}) is too large")]
    TooLarge { rows: usize, cols: usize },
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown cell tag '{tag}' at ({row}, {col})")]
    UnknownTag { tag: char, row: usize, col: usize },
}

/// A generic 2D grid structure.
///
/// Stores elements of type `T` in a flat vector using row-major order.
/// Cells are addressed by [`Position`]; negative or oversized coordinates are
/// simply out of bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid with the specified dimensions, filled with default values.
    ///
    /// Fails with [`GridError::TooLarge`] if the cell count overflows or a
    /// dimension does not fit a signed coordinate.
    pub fn new(rows: usize, cols: usize) -> Result<Self, GridError>
    where
        T: Default + Clone,
    {
        let size = Self::checked_size(rows, cols)?;
        Ok(Grid {
            rows,
            cols,
            cells: vec![T::default(); size],
        })
    }

    /// Creates a new grid filled by a generator function taking the cell position.
    pub fn from_generator<F>(rows: usize, cols: usize, mut f: F) -> Result<Self, GridError>
    where
        F: FnMut(Position) -> T,
    {
        let size = Self::checked_size(rows, cols)?;
        let mut cells = Vec::with_capacity(size);
        for row in 0..rows {
            for col in 0..cols {
                cells.push(f(Position::new(row as i32, col as i32)));
            }
        }
        Ok(Grid { rows, cols, cells })
    }

    fn checked_size(rows: usize, cols: usize) -> Result<usize, GridError> {
        let fits = i32::try_from(rows).is_ok() && i32::try_from(cols).is_ok();
        match rows.checked_mul(cols) {
            Some(size) if fits => Ok(size),
            _ => Err(GridError::TooLarge { rows, cols }),
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Converts a position to a flat vector index.
    ///
    /// Returns `None` if the position is out of bounds.
    #[inline]
    pub fn index_of(&self, position: Position) -> Option<usize> {
        if self.contains(position) {
            Some(position.row as usize * self.cols + position.col as usize)
        } else {
            None
        }
    }

    /// Converts a flat vector index back to a position.
    #[inline]
    pub fn position_of(&self, index: usize) -> Option<Position> {
        if index < self.cells.len() {
            Some(Position::new(
                (index / self.cols) as i32,
                (index % self.cols) as i32,
            ))
        } else {
            None
        }
    }

    /// Checks if the given position is within the grid boundaries.
    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        position.row >= 0
            && position.col >= 0
            && (position.row as usize) < self.rows
            && (position.col as usize) < self.cols
    }

    pub fn get(&self, position: Position) -> Option<&T> {
        self.index_of(position).and_then(|index| self.cells.get(index))
    }

    pub fn get_mut(&mut self, position: Position) -> Option<&mut T> {
        self.index_of(position)
            .and_then(move |index| self.cells.get_mut(index))
    }

    /// Sets the value of the cell at the given position.
    pub fn set(&mut self, position: Position, value: T) -> Result<(), GridError> {
        let index = self.index_of(position).ok_or(GridError::OutOfBounds {
            position,
            rows: self.rows,
            cols: self.cols,
        })?;
        self.cells[index] = value;
        Ok(())
    }

    /// Returns an iterator over the cells of the grid in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    /// Returns an iterator that yields `(Position, &T)` for each cell.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        let cols = self.cols;
        self.cells.iter().enumerate().map(move |(index, cell)| {
            (
                Position::new((index / cols) as i32, (index % cols) as i32),
                cell,
            )
        })
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, position: Position) -> &Self::Output {
        match self.index_of(position) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for grid size ({}, {})",
                position.row, position.col, self.rows, self.cols
            ),
        }
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, position: Position) -> &mut Self::Output {
        let (rows, cols) = (self.rows, self.cols);
        match self.index_of(position) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for grid size ({}, {})",
                position.row, position.col, rows, cols
            ),
        }
    }
}

/// The walkability oracle over a fixed-size matrix of [`CellKind`].
///
/// Besides the matrix it caches the last known position of the singleton
/// entities (mover, goal, hazard) and keeps the list of gadget cells. An
/// actor standing on the goal or a gadget hides it; the hidden cell comes
/// back when the actor leaves. The dimensions never change after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridMap {
    cells: Grid<CellKind>,
    mover: Option<Position>,
    goal: Option<Position>,
    hazard: Option<Position>,
    gadgets: Vec<Position>,
    covered: HashMap<Position, CellKind>,
}

impl GridMap {
    /// Creates an all-empty map.
    pub fn new(rows: usize, cols: usize) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::EmptyGrid);
        }
        Ok(GridMap {
            cells: Grid::new(rows, cols)?,
            mover: None,
            goal: None,
            hazard: None,
            gadgets: Vec::new(),
            covered: HashMap::new(),
        })
    }

    /// Builds a map from rows of cell tags (see [`CellKind::from_tag`]).
    ///
    /// The first row fixes the width; every other row must match it.
    pub fn load<S: AsRef<str>>(rows_of_tags: &[S]) -> Result<Self, GridError> {
        let width = rows_of_tags
            .first()
            .map(|row| row.as_ref().chars().count())
            .unwrap_or(0);
        let mut map = GridMap::new(rows_of_tags.len(), width)?;

        for (row, line) in rows_of_tags.iter().enumerate() {
            let line = line.as_ref();
            let found = line.chars().count();
            if found != width {
                return Err(GridError::RaggedRow {
                    row,
                    expected: width,
                    found,
                });
            }
            for (col, tag) in line.chars().enumerate() {
                let kind = CellKind::from_tag(tag).ok_or(GridError::UnknownTag { tag, row, col })?;
                map.set_cell(Position::new(row as i32, col as i32), kind)?;
            }
        }

        Ok(map)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.cells.rows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cells.cols()
    }

    #[inline]
    pub fn in_bounds(&self, position: Position) -> bool {
        self.cells.contains(position)
    }

    /// In bounds, not a wall and not occupied by the hazard.
    pub fn is_walkable(&self, position: Position) -> bool {
        match self.cells.get(position) {
            Some(CellKind::Wall) | Some(CellKind::Actor(ActorKind::Hazard)) | None => false,
            Some(_) => true,
        }
    }

    /// Returns the cell kind, or `None` when out of bounds.
    pub fn cell_at(&self, position: Position) -> Option<CellKind> {
        self.cells.get(position).copied()
    }

    /// Writes a cell and keeps the singleton cache and gadget list current.
    ///
    /// Writing an actor over the goal or a gadget keeps that cell underneath;
    /// writing any other kind replaces whatever was there.
    pub fn set_cell(&mut self, position: Position, kind: CellKind) -> Result<(), GridError> {
        let previous = self.cell_at(position);
        self.cells.set(position, kind)?;

        match kind {
            CellKind::Actor(actor) => {
                match actor {
                    ActorKind::Mover => self.mover = Some(position),
                    ActorKind::Hazard => self.hazard = Some(position),
                }
                if let Some(
                    hidden @ (CellKind::Goal | CellKind::SpeedGadget | CellKind::DoorGadget),
                ) = previous
                {
                    self.covered.insert(position, hidden);
                }
            }
            CellKind::Goal => self.goal = Some(position),
            CellKind::SpeedGadget | CellKind::DoorGadget => {
                if !self.gadgets.contains(&position) {
                    self.gadgets.push(position);
                }
            }
            CellKind::Empty | CellKind::Wall => {}
        }

        if !matches!(kind, CellKind::Actor(_)) {
            self.covered.remove(&position);
            if !kind.is_gadget() {
                self.gadgets.retain(|&gadget| gadget != position);
            }
            if kind != CellKind::Goal && self.goal == Some(position) {
                self.goal = None;
            }
        }
        Ok(())
    }

    /// The cell an actor is standing on, if it hides anything.
    pub fn covered_at(&self, position: Position) -> Option<CellKind> {
        self.covered.get(&position).copied()
    }

    /// Clears a cell after an actor leaves it, bringing back whatever the
    /// actor was standing on.
    pub fn vacate(&mut self, position: Position) -> Result<(), GridError> {
        let previous = self.cell_at(position);
        let restored = self.covered.get(&position).copied().unwrap_or(CellKind::Empty);
        self.set_cell(position, restored)?;
        match previous {
            Some(CellKind::Actor(ActorKind::Mover)) if self.mover == Some(position) => {
                self.mover = None
            }
            Some(CellKind::Actor(ActorKind::Hazard)) if self.hazard == Some(position) => {
                self.hazard = None
            }
            Some(CellKind::Actor(_)) | Some(CellKind::Empty) => {}
            Some(other) => warn!(
                "Vacated ({}, {}) which held {:?} rather than an actor",
                position.row, position.col, other
            ),
            None => {}
        }
        Ok(())
    }

    /// Moves an actor from one cell to another, vacating the old cell.
    pub fn move_actor(
        &mut self,
        actor: ActorKind,
        from: Position,
        to: Position,
    ) -> Result<(), GridError> {
        if !self.in_bounds(to) {
            return Err(self.out_of_bounds(to));
        }
        if self.cell_at(from) == Some(CellKind::Actor(actor)) {
            self.vacate(from)?;
        }
        self.set_cell(to, CellKind::Actor(actor))
    }

    #[inline]
    pub fn index_of(&self, position: Position) -> Option<usize> {
        self.cells.index_of(position)
    }

    #[inline]
    pub fn position_of(&self, index: usize) -> Option<Position> {
        self.cells.position_of(index)
    }

    pub fn mover(&self) -> Option<Position> {
        self.mover
    }

    pub fn goal(&self) -> Option<Position> {
        self.goal
    }

    pub fn hazard(&self) -> Option<Position> {
        self.hazard
    }

    /// Gadget cells in the order they were first placed.
    pub fn gadgets(&self) -> &[Position] {
        &self.gadgets
    }

    /// All positions currently holding `kind`, in row-major order.
    pub fn positions_of(&self, kind: CellKind) -> Vec<Position> {
        self.cells
            .enumerate()
            .filter_map(|(position, cell)| (*cell == kind).then_some(position))
            .collect()
    }

    fn out_of_bounds(&self, position: Position) -> GridError {
        GridError::OutOfBounds {
            position,
            rows: self.rows(),
            cols: self.cols(),
        }
    }
}
