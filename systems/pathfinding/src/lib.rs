#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid path search and spatial queries over the spire's terrain.
//!
//! Every function here is a pure function of the [`TerrainView`] passed in:
//! no state survives between calls, and search scratch space is allocated
//! fresh per invocation. Callers that plan across ticks re-query with a fresh
//! view so mined and built cells are always respected.

use std::collections::VecDeque;

use spire_core::{BlockingKind, CellCoord, PathMode, TerrainView, STEP_COST};
use thiserror::Error;

/// Errors raised for illegal search endpoints.
///
/// Exhausting the open set without reaching the goal is not an error; it is
/// the `Ok(None)` outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PathError {
    /// An endpoint lies outside the grid, in any traversal mode.
    #[error("cell {0:?} lies outside the grid")]
    OutOfBounds(CellCoord),
    /// The start cell is blocked and the mode does not tolerate that.
    #[error("start cell {0:?} is blocked")]
    BlockedStart(CellCoord),
    /// The goal cell is blocked and the mode does not tolerate that.
    #[error("goal cell {0:?} is blocked")]
    BlockedGoal(CellCoord),
}

/// Ordered sequence of cells from next step to goal, owned by one agent.
///
/// The path is start-exclusive and goal-inclusive; [`CellPath::pop_next`]
/// yields the nearest step first. The container itself is never exposed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CellPath {
    cells: VecDeque<CellCoord>,
}

impl CellPath {
    /// Creates an empty, exhausted path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a path from cells ordered nearest-first.
    #[must_use]
    pub fn from_cells(cells: Vec<CellCoord>) -> Self {
        Self {
            cells: cells.into(),
        }
    }

    /// Next cell to step onto without consuming it.
    #[must_use]
    pub fn peek_next(&self) -> Option<CellCoord> {
        self.cells.front().copied()
    }

    /// Consumes and returns the next cell to step onto.
    pub fn pop_next(&mut self) -> Option<CellCoord> {
        self.cells.pop_front()
    }

    /// Final cell of the path, if any remain.
    #[must_use]
    pub fn goal(&self) -> Option<CellCoord> {
        self.cells.back().copied()
    }

    /// Number of steps remaining.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether no steps remain.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cells.is_empty()
    }

    /// Discards every remaining step.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Consumes the path, yielding its cells nearest-first.
    #[must_use]
    pub fn into_vec(self) -> Vec<CellCoord> {
        self.cells.into()
    }
}

/// Computes the cheapest walkable route between two cells.
///
/// Classic grid A* with unit step cost [`STEP_COST`], four-directional
/// movement, and a per-node Manhattan heuristic. Neighbor legality follows
/// `mode`; see [`PathMode`]. The open and closed sets are plain lists and
/// ties on f-cost resolve to the earliest-discovered node.
///
/// Returns `Ok(None)` when no route exists between legal endpoints.
///
/// # Errors
///
/// [`PathError::OutOfBounds`] when either endpoint leaves the grid;
/// [`PathError::BlockedStart`] and [`PathError::BlockedGoal`] when an
/// endpoint is blocked in a mode other than [`PathMode::Breach`].
pub fn shortest_path(
    terrain: &TerrainView<'_>,
    start: CellCoord,
    goal: CellCoord,
    mode: PathMode,
) -> Result<Option<CellPath>, PathError> {
    if !terrain.contains(start) {
        return Err(PathError::OutOfBounds(start));
    }
    if !terrain.contains(goal) {
        return Err(PathError::OutOfBounds(goal));
    }

    if mode != PathMode::Breach {
        if terrain.blocking(start) == Some(BlockingKind::Full) {
            return Err(PathError::BlockedStart(start));
        }
        if terrain.blocking(goal) == Some(BlockingKind::Full) {
            return Err(PathError::BlockedGoal(goal));
        }
    }

    let (columns, rows) = terrain.dimensions();
    let width = usize::try_from(columns).unwrap_or(0);
    let cell_count = width * usize::try_from(rows).unwrap_or(0);
    if cell_count == 0 {
        return Err(PathError::OutOfBounds(start));
    }

    let mut scratch = Scratch::new(cell_count);
    let start_index = index_of(width, start);
    scratch.g[start_index] = 0;
    scratch.in_open[start_index] = true;
    scratch.open.push(start_index);

    while let Some(slot) = scratch.lowest_f_slot(columns, goal) {
        let current_index = scratch.open.swap_remove(slot);
        scratch.in_open[current_index] = false;
        scratch.closed[current_index] = true;
        let current = coord_of(columns, current_index);

        if current == goal {
            return Ok(Some(reconstruct(&scratch, columns, current_index, start)));
        }

        for direction in spire_core::Direction::ALL {
            let Some(neighbor) = current.stepped(direction) else {
                continue;
            };
            if !terrain.contains(neighbor) {
                continue;
            }
            if !neighbor_legal(terrain, neighbor, goal, mode) {
                continue;
            }

            let neighbor_index = index_of(width, neighbor);
            if scratch.closed[neighbor_index] {
                continue;
            }

            let tentative = scratch.g[current_index].saturating_add(STEP_COST);
            if tentative >= scratch.g[neighbor_index] {
                continue;
            }

            scratch.g[neighbor_index] = tentative;
            scratch.parent[neighbor_index] = Some(current_index);
            if !scratch.in_open[neighbor_index] {
                scratch.in_open[neighbor_index] = true;
                scratch.open.push(neighbor_index);
            }
        }
    }

    Ok(None)
}

/// Reports whether two cells see each other along an unobstructed
/// axis-aligned line.
///
/// True only when the cells share exactly one axis coordinate and every
/// intermediate cell on the line between them is non-blocking. The endpoints
/// themselves are not inspected.
#[must_use]
pub fn straight_sighted(terrain: &TerrainView<'_>, from: CellCoord, to: CellCoord) -> bool {
    let same_column = from.column() == to.column();
    let same_row = from.row() == to.row();
    if same_column == same_row {
        return false;
    }

    if same_column {
        let low = from.row().min(to.row());
        let high = from.row().max(to.row());
        ((low + 1)..high).all(|row| terrain.is_open(CellCoord::new(from.column(), row)))
    } else {
        let low = from.column().min(to.column());
        let high = from.column().max(to.column());
        ((low + 1)..high).all(|column| terrain.is_open(CellCoord::new(column, from.row())))
    }
}

/// Enumerates the non-blocking cardinal neighbors of a cell.
///
/// Returns `None` when the origin itself lies outside the grid, mirroring
/// the distinction callers draw between "no open neighbors" and "no such
/// cell".
#[must_use]
pub fn walkable_neighbors(
    terrain: &TerrainView<'_>,
    origin: CellCoord,
) -> Option<Vec<CellCoord>> {
    if !terrain.contains(origin) {
        return None;
    }

    let mut neighbors = Vec::with_capacity(4);
    for direction in spire_core::Direction::ALL {
        if let Some(cell) = origin.stepped(direction) {
            if terrain.is_open(cell) {
                neighbors.push(cell);
            }
        }
    }
    Some(neighbors)
}

/// Manhattan distance between two cells.
#[must_use]
pub fn manhattan(a: CellCoord, b: CellCoord) -> u32 {
    a.manhattan_distance(b)
}

/// Reports whether two cells are cardinal neighbors.
#[must_use]
pub fn adjacent(a: CellCoord, b: CellCoord) -> bool {
    manhattan(a, b) == 1
}

struct Scratch {
    g: Vec<u32>,
    parent: Vec<Option<usize>>,
    closed: Vec<bool>,
    in_open: Vec<bool>,
    open: Vec<usize>,
}

impl Scratch {
    fn new(cell_count: usize) -> Self {
        Self {
            g: vec![u32::MAX; cell_count],
            parent: vec![None; cell_count],
            closed: vec![false; cell_count],
            in_open: vec![false; cell_count],
            open: Vec::new(),
        }
    }

    /// Position within the open list of the node with the lowest f-cost.
    /// Strict comparison keeps the earliest-discovered node on ties.
    fn lowest_f_slot(&self, columns: u32, goal: CellCoord) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        for (slot, &node) in self.open.iter().enumerate() {
            let h = coord_of(columns, node)
                .manhattan_distance(goal)
                .saturating_mul(STEP_COST);
            let f = self.g[node].saturating_add(h);
            match best {
                Some((_, best_f)) if f >= best_f => {}
                _ => best = Some((slot, f)),
            }
        }
        best.map(|(slot, _)| slot)
    }
}

fn neighbor_legal(
    terrain: &TerrainView<'_>,
    neighbor: CellCoord,
    goal: CellCoord,
    mode: PathMode,
) -> bool {
    match mode {
        PathMode::Standard => terrain.is_open(neighbor),
        PathMode::Phasing => true,
        PathMode::Breach => terrain.is_open(neighbor) || neighbor == goal,
    }
}

fn reconstruct(scratch: &Scratch, columns: u32, goal_index: usize, start: CellCoord) -> CellPath {
    let mut cells = Vec::new();
    let mut cursor = Some(goal_index);
    while let Some(index) = cursor {
        let cell = coord_of(columns, index);
        if cell == start {
            break;
        }
        cells.push(cell);
        cursor = scratch.parent[index];
    }
    cells.reverse();
    CellPath::from_cells(cells)
}

fn index_of(width: usize, cell: CellCoord) -> usize {
    cell.row() as usize * width + cell.column() as usize
}

fn coord_of(columns: u32, index: usize) -> CellCoord {
    let index = index as u32;
    CellCoord::new(index % columns, index / columns)
}
