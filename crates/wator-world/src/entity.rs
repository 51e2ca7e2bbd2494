//! Fish and shark state.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use wator_core::{CellKind, EntityId, Position};

/// Mutable part of a fish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FishState {
    pub position: Position,
    pub breed_timer: u32,
}

/// Mutable part of a shark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharkState {
    pub position: Position,
    pub breed_timer: u32,
    pub starve: u32,
}

/// A fish. Shared between the grid, the registry and worker snapshots, so
/// the timers sit behind a lock; only the worker owning the fish's
/// partition for the current tick writes them.
#[derive(Debug)]
pub struct Fish {
    id: EntityId,
    state: Mutex<FishState>,
}

/// A shark, shared the same way as [`Fish`].
#[derive(Debug)]
pub struct Shark {
    id: EntityId,
    state: Mutex<SharkState>,
}

pub type FishRef = Arc<Fish>;
pub type SharkRef = Arc<Shark>;

impl Fish {
    /// A fresh fish with a zeroed breed timer
    pub fn spawn(position: Position) -> FishRef {
        Arc::new(Self {
            id: EntityId::new(),
            state: Mutex::new(FishState {
                position,
                breed_timer: 0,
            }),
        })
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn state(&self) -> FishState {
        *self.state.lock()
    }

    pub fn position(&self) -> Position {
        self.state.lock().position
    }

    pub(crate) fn state_mut(&self) -> parking_lot::MutexGuard<'_, FishState> {
        self.state.lock()
    }
}

impl Shark {
    /// A fresh shark with zeroed breed and starve counters
    pub fn spawn(position: Position) -> SharkRef {
        Arc::new(Self {
            id: EntityId::new(),
            state: Mutex::new(SharkState {
                position,
                breed_timer: 0,
                starve: 0,
            }),
        })
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn state(&self) -> SharkState {
        *self.state.lock()
    }

    pub fn position(&self) -> Position {
        self.state.lock().position
    }

    pub(crate) fn state_mut(&self) -> parking_lot::MutexGuard<'_, SharkState> {
        self.state.lock()
    }
}

/// Anything kept in a registry list and removed by identity
pub trait Identified {
    fn id(&self) -> EntityId;
}

impl Identified for Fish {
    fn id(&self) -> EntityId {
        Fish::id(self)
    }
}

impl Identified for Shark {
    fn id(&self) -> EntityId {
        Shark::id(self)
    }
}

/// Contents of one grid cell
#[derive(Debug, Clone, Default)]
pub enum Occupant {
    #[default]
    Empty,
    Fish(FishRef),
    Shark(SharkRef),
}

impl Occupant {
    pub fn is_empty(&self) -> bool {
        matches!(self, Occupant::Empty)
    }

    pub fn kind(&self) -> CellKind {
        match self {
            Occupant::Empty => CellKind::Empty,
            Occupant::Fish(_) => CellKind::Fish,
            Occupant::Shark(_) => CellKind::Shark,
        }
    }

    pub fn id(&self) -> Option<EntityId> {
        match self {
            Occupant::Empty => None,
            Occupant::Fish(fish) => Some(fish.id()),
            Occupant::Shark(shark) => Some(shark.id()),
        }
    }

    /// Whether this cell still holds the entity `id`
    pub fn holds(&self, id: EntityId) -> bool {
        self.id() == Some(id)
    }
}
