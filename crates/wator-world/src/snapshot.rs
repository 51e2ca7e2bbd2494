//! Read-only frames handed to a renderer.

use serde::{Deserialize, Serialize};
use wator_core::{CellKind, Position, Result};

/// Occupant kind of every cell at one tick boundary, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    pub width: i32,
    pub height: i32,
    cells: Vec<CellKind>,
}

impl RenderSnapshot {
    pub fn new(width: i32, height: i32, cells: Vec<CellKind>) -> Self {
        debug_assert_eq!(cells.len(), (width * height) as usize);
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn get(&self, pos: Position) -> CellKind {
        let pos = pos.wrap(self.width, self.height);
        self.cells[(pos.y * self.width + pos.x) as usize]
    }

    pub fn cells(&self) -> &[CellKind] {
        &self.cells
    }

    pub fn fish_count(&self) -> usize {
        self.count(CellKind::Fish)
    }

    pub fn shark_count(&self) -> usize {
        self.count(CellKind::Shark)
    }

    fn count(&self, kind: CellKind) -> usize {
        self.cells.iter().filter(|&&cell| cell == kind).count()
    }

    /// Compact binary form for an out-of-process renderer
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
