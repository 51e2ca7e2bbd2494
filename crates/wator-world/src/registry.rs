//! Canonical fish and shark lists.

use crate::entity::{FishRef, SharkRef};
use parking_lot::RwLock;
use wator_core::Position;

/// An entity handle paired with where it stood when the snapshot was taken.
#[derive(Debug, Clone)]
pub struct Snapshotted<T> {
    pub entity: T,
    pub origin: Position,
}

/// Shallow copy of both lists, taken between ticks.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    pub fish: Vec<Snapshotted<FishRef>>,
    pub sharks: Vec<Snapshotted<SharkRef>>,
}

/// Canonical population lists. Only the reconciler changes membership;
/// everyone else reads snapshots.
#[derive(Debug, Default)]
pub struct Registry {
    fish: RwLock<Vec<FishRef>>,
    sharks: RwLock<Vec<SharkRef>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_population(fish: Vec<FishRef>, sharks: Vec<SharkRef>) -> Self {
        Self {
            fish: RwLock::new(fish),
            sharks: RwLock::new(sharks),
        }
    }

    /// Copy both lists, each under its own list lock, recording every
    /// entity's current position as its origin for the coming tick.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let fish = self
            .fish
            .read()
            .iter()
            .map(|fish| Snapshotted {
                entity: fish.clone(),
                origin: fish.position(),
            })
            .collect();

        let sharks = self
            .sharks
            .read()
            .iter()
            .map(|shark| Snapshotted {
                entity: shark.clone(),
                origin: shark.position(),
            })
            .collect();

        RegistrySnapshot { fish, sharks }
    }

    pub fn fish(&self) -> Vec<FishRef> {
        self.fish.read().clone()
    }

    pub fn sharks(&self) -> Vec<SharkRef> {
        self.sharks.read().clone()
    }

    pub fn fish_count(&self) -> usize {
        self.fish.read().len()
    }

    pub fn shark_count(&self) -> usize {
        self.sharks.read().len()
    }

    pub(crate) fn fish_list(&self) -> &RwLock<Vec<FishRef>> {
        &self.fish
    }

    pub(crate) fn shark_list(&self) -> &RwLock<Vec<SharkRef>> {
        &self.sharks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Fish, Shark};

    #[test]
    fn test_snapshot_records_origins() {
        let fish = Fish::spawn(Position::new(1, 2));
        let shark = Shark::spawn(Position::new(4, 0));
        let registry = Registry::from_population(vec![fish.clone()], vec![shark.clone()]);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.fish.len(), 1);
        assert_eq!(snapshot.fish[0].origin, Position::new(1, 2));
        assert_eq!(snapshot.sharks[0].origin, Position::new(4, 0));

        // Later moves do not rewrite the recorded origin
        fish.state_mut().position = Position::new(1, 3);
        assert_eq!(snapshot.fish[0].origin, Position::new(1, 2));
        assert_eq!(snapshot.fish[0].entity.position(), Position::new(1, 3));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let registry = Registry::from_population(vec![Fish::spawn(Position::new(0, 0))], vec![]);
        let snapshot = registry.snapshot();
        registry.fish_list().write().clear();
        assert_eq!(snapshot.fish.len(), 1);
        assert_eq!(registry.fish_count(), 0);
    }
}
