//! Post-tick merge of worker intents into the registry.

use crate::entity::Identified;
use crate::registry::Registry;
use crate::worker::LocalIntents;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use wator_core::EntityId;

/// Net effect of one reconcile pass on one species
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpeciesDelta {
    /// Entities dropped from the canonical list
    pub removed: usize,
    /// Entities appended to the canonical list
    pub added: usize,
    /// Entities born and removed within the same tick, never appended
    pub stillborn: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub fish: SpeciesDelta,
    pub sharks: SpeciesDelta,
}

/// Fold every worker's intents into `registry`.
///
/// Must only run once all workers of the tick have finished. Each species
/// is filtered and extended under its own write lock, so no snapshot can
/// observe a half-applied tick.
pub fn reconcile(registry: &Registry, intents: impl IntoIterator<Item = LocalIntents>) -> ReconcileSummary {
    let mut fish_added = Vec::new();
    let mut fish_removed = Vec::new();
    let mut sharks_added = Vec::new();
    let mut sharks_removed = Vec::new();

    for local in intents {
        fish_added.extend(local.fish_added);
        fish_removed.extend(local.fish_removed);
        sharks_added.extend(local.sharks_added);
        sharks_removed.extend(local.sharks_removed);
    }

    ReconcileSummary {
        fish: merge_species(registry.fish_list(), fish_added, fish_removed),
        sharks: merge_species(registry.shark_list(), sharks_added, sharks_removed),
    }
}

fn merge_species<T: Identified>(
    list: &RwLock<Vec<Arc<T>>>,
    added: Vec<Arc<T>>,
    removed: Vec<Arc<T>>,
) -> SpeciesDelta {
    let excluded: HashSet<EntityId> = removed.iter().map(|entity| entity.id()).collect();

    let mut list = list.write();
    let before = list.len();
    list.retain(|entity| !excluded.contains(&entity.id()));
    let dropped = before - list.len();

    // A fish born this tick may already have been eaten across a boundary
    let offered = added.len();
    list.extend(added.into_iter().filter(|entity| !excluded.contains(&entity.id())));
    let appended = list.len() - (before - dropped);

    SpeciesDelta {
        removed: dropped,
        added: appended,
        stillborn: offered - appended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Fish, Shark};
    use wator_core::Position;

    #[test]
    fn test_removals_and_additions() {
        let keep = Fish::spawn(Position::new(0, 0));
        let eaten = Fish::spawn(Position::new(1, 0));
        let registry = Registry::from_population(vec![keep.clone(), eaten.clone()], vec![]);

        let born = Fish::spawn(Position::new(2, 0));
        let intents = LocalIntents {
            fish_added: vec![born.clone()],
            fish_removed: vec![eaten.clone()],
            ..Default::default()
        };

        let summary = reconcile(&registry, vec![intents]);
        assert_eq!(summary.fish, SpeciesDelta { removed: 1, added: 1, stillborn: 0 });

        let ids: Vec<EntityId> = registry.fish().iter().map(|f| f.id()).collect();
        assert_eq!(ids, vec![keep.id(), born.id()]);
    }

    #[test]
    fn test_removal_is_by_identity() {
        // Same position and timers, different fish
        let a = Fish::spawn(Position::new(3, 3));
        let b = Fish::spawn(Position::new(3, 3));
        let registry = Registry::from_population(vec![a.clone(), b.clone()], vec![]);

        let intents = LocalIntents {
            fish_removed: vec![a.clone()],
            ..Default::default()
        };
        reconcile(&registry, vec![intents]);

        let remaining = registry.fish();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id(), b.id());
    }

    #[test]
    fn test_newborn_eaten_same_tick_is_not_appended() {
        let registry = Registry::new();
        let newborn = Fish::spawn(Position::new(4, 4));

        let birth = LocalIntents {
            fish_added: vec![newborn.clone()],
            ..Default::default()
        };
        let meal = LocalIntents {
            fish_removed: vec![newborn.clone()],
            ..Default::default()
        };

        let summary = reconcile(&registry, vec![birth, meal]);
        assert_eq!(summary.fish, SpeciesDelta { removed: 0, added: 0, stillborn: 1 });
        assert_eq!(registry.fish_count(), 0);
    }

    #[test]
    fn test_species_are_independent() {
        let shark = Shark::spawn(Position::new(0, 0));
        let fish = Fish::spawn(Position::new(1, 1));
        let registry = Registry::from_population(vec![fish.clone()], vec![shark.clone()]);

        let pup = Shark::spawn(Position::new(0, 1));
        let worker_a = LocalIntents {
            sharks_removed: vec![shark.clone()],
            ..Default::default()
        };
        let worker_b = LocalIntents {
            sharks_added: vec![pup.clone()],
            ..Default::default()
        };

        let summary = reconcile(&registry, vec![worker_a, worker_b]);
        assert_eq!(summary.sharks.removed, 1);
        assert_eq!(summary.sharks.added, 1);
        assert_eq!(summary.fish, SpeciesDelta::default());
        assert_eq!(registry.fish_count(), 1);
        assert_eq!(registry.sharks()[0].id(), pup.id());
    }
}
