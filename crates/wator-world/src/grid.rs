//! 2D toroidal grid with one lock per cell.

use crate::entity::Occupant;
use crate::snapshot::RenderSnapshot;
use parking_lot::{Mutex, MutexGuard};
use wator_core::{CellKind, Direction, Position};

/// A 2D toroidal grid.
///
/// Every coordinate handed in is wrapped first, so no position is ever out
/// of range. Reading or writing a cell requires holding its lock.
#[derive(Debug)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    cells: Vec<Mutex<Occupant>>,
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Self {
        let size = (width * height) as usize;
        Self {
            width,
            height,
            cells: (0..size).map(|_| Mutex::new(Occupant::Empty)).collect(),
        }
    }

    pub fn wrap(&self, pos: Position) -> Position {
        pos.wrap(self.width, self.height)
    }

    /// The cell one step away in `direction`
    pub fn neighbor(&self, pos: Position, direction: Direction) -> Position {
        pos.step(direction, self.width, self.height)
    }

    /// Lock the cell at `pos`
    pub fn lock(&self, pos: Position) -> MutexGuard<'_, Occupant> {
        let index = self.pos_to_index(self.wrap(pos));
        self.cells[index].lock()
    }

    /// Lock two distinct cells in ascending index order and hand the guards
    /// back as `(a, b)`.
    pub(crate) fn lock_pair(
        &self,
        a: Position,
        b: Position,
    ) -> (MutexGuard<'_, Occupant>, MutexGuard<'_, Occupant>) {
        let ia = self.pos_to_index(self.wrap(a));
        let ib = self.pos_to_index(self.wrap(b));
        debug_assert_ne!(ia, ib, "a move never targets its own cell");

        if ia < ib {
            let ga = self.cells[ia].lock();
            let gb = self.cells[ib].lock();
            (ga, gb)
        } else {
            let gb = self.cells[ib].lock();
            let ga = self.cells[ia].lock();
            (ga, gb)
        }
    }

    /// Clone of whatever occupies `pos`
    pub fn occupant(&self, pos: Position) -> Occupant {
        self.lock(pos).clone()
    }

    pub fn kind_at(&self, pos: Position) -> CellKind {
        self.lock(pos).kind()
    }

    /// Read-only view of every cell for an external renderer.
    pub fn render_snapshot(&self) -> RenderSnapshot {
        let cells = self.cells.iter().map(|cell| cell.lock().kind()).collect();
        RenderSnapshot::new(self.width, self.height, cells)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn pos_to_index(&self, pos: Position) -> usize {
        (pos.y * self.width + pos.x) as usize
    }

    /// Get position from index
    pub fn index_to_pos(&self, index: usize) -> Position {
        let x = (index as i32) % self.width;
        let y = (index as i32) / self.width;
        Position::new(x, y)
    }

    /// Iterator over all positions
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cells.len()).map(move |i| self.index_to_pos(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Fish;

    #[test]
    fn test_grid_creation() {
        let grid = Grid::new(10, 8);
        assert_eq!(grid.width, 10);
        assert_eq!(grid.height, 8);
        assert_eq!(grid.len(), 80);
        assert!(grid.positions().all(|p| grid.kind_at(p) == CellKind::Empty));
    }

    #[test]
    fn test_toroidal_addressing() {
        let grid = Grid::new(10, 10);
        let fish = Fish::spawn(Position::new(9, 9));
        *grid.lock(Position::new(9, 9)) = Occupant::Fish(fish.clone());

        // (-1, -1) wraps onto (9, 9)
        assert!(grid.occupant(Position::new(-1, -1)).holds(fish.id()));
        assert_eq!(grid.kind_at(Position::new(19, 29)), CellKind::Fish);
    }

    #[test]
    fn test_neighbor_wraps() {
        let grid = Grid::new(6, 4);
        assert_eq!(grid.neighbor(Position::new(0, 2), Direction::West), Position::new(5, 2));
        assert_eq!(grid.neighbor(Position::new(3, 3), Direction::South), Position::new(3, 0));
        assert_eq!(grid.neighbor(Position::new(3, 0), Direction::North), Position::new(3, 3));
        assert_eq!(grid.neighbor(Position::new(5, 1), Direction::East), Position::new(0, 1));
    }

    #[test]
    fn test_lock_pair_returns_guards_in_argument_order() {
        let grid = Grid::new(4, 4);
        let fish = Fish::spawn(Position::new(3, 3));
        *grid.lock(Position::new(3, 3)) = Occupant::Fish(fish.clone());

        let (high, low) = grid.lock_pair(Position::new(3, 3), Position::new(0, 0));
        assert!(high.holds(fish.id()));
        assert!(low.is_empty());
    }

    #[test]
    fn test_index_roundtrip() {
        let grid = Grid::new(7, 5);
        for pos in grid.positions() {
            assert_eq!(grid.index_to_pos(grid.pos_to_index(pos)), pos);
        }
    }
}
