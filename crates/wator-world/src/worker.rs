//! Per-partition tick logic.
//!
//! A worker walks the entities whose snapshot origin lies in its partition
//! and tries up to four shuffled directions for each. Every attempt locks
//! the boundary locks it crosses (sorted by id), then the source and
//! destination cells (ascending index), and re-reads both cells before
//! acting. Births and deaths are recorded as local intents; the canonical
//! registry is never touched here.

use crate::entity::{Fish, FishRef, Occupant, Shark, SharkRef};
use crate::grid::Grid;
use crate::partition::{BoundaryGuards, Partition};
use crate::registry::RegistrySnapshot;
use parking_lot::MutexGuard;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};
use wator_core::{BreedConfig, Direction, Position};

/// Births and deaths decided by one worker during one tick
#[derive(Debug, Default)]
pub struct LocalIntents {
    pub fish_added: Vec<FishRef>,
    pub fish_removed: Vec<FishRef>,
    pub sharks_added: Vec<SharkRef>,
    pub sharks_removed: Vec<SharkRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub moves: usize,
    pub crossings: usize,
    pub fish_born: usize,
    pub sharks_born: usize,
    pub fish_eaten: usize,
    pub sharks_starved: usize,
    /// Entities that found no legal move and stayed put
    pub stranded: usize,
}

#[derive(Debug)]
pub struct WorkerReport {
    pub partition: usize,
    pub intents: LocalIntents,
    pub stats: WorkerStats,
}

enum Attempt {
    Moved,
    Blocked,
    /// The entity no longer occupies its cell (eaten from a neighbouring
    /// partition earlier this tick)
    Gone,
}

/// Everything held for a single move. Fields drop in declaration order:
/// cells first, then boundary locks.
struct MoveLocks<'a> {
    src: MutexGuard<'a, Occupant>,
    dst: MutexGuard<'a, Occupant>,
    boundary: BoundaryGuards<'a>,
}

pub struct Worker<'a> {
    partition: &'a Partition,
    grid: &'a Grid,
    rules: &'a BreedConfig,
    rng: ChaCha8Rng,
    intents: LocalIntents,
    stats: WorkerStats,
}

impl<'a> Worker<'a> {
    pub fn new(partition: &'a Partition, grid: &'a Grid, rules: &'a BreedConfig, seed: u64) -> Self {
        Self {
            partition,
            grid,
            rules,
            rng: ChaCha8Rng::seed_from_u64(seed),
            intents: LocalIntents::default(),
            stats: WorkerStats::default(),
        }
    }

    /// Advance every entity this partition owned at snapshot time.
    /// Fish go first, then sharks.
    pub fn run(mut self, snapshot: &RegistrySnapshot) -> WorkerReport {
        for entry in &snapshot.fish {
            if self.partition.contains(entry.origin) {
                self.step_fish(&entry.entity, entry.origin);
            }
        }

        for entry in &snapshot.sharks {
            if self.partition.contains(entry.origin) {
                self.step_shark(&entry.entity, entry.origin);
            }
        }

        debug!(
            partition = self.partition.index,
            moves = self.stats.moves,
            crossings = self.stats.crossings,
            fish_born = self.stats.fish_born,
            sharks_born = self.stats.sharks_born,
            fish_eaten = self.stats.fish_eaten,
            sharks_starved = self.stats.sharks_starved,
            stranded = self.stats.stranded,
            "Partition tick complete"
        );

        WorkerReport {
            partition: self.partition.index,
            intents: self.intents,
            stats: self.stats,
        }
    }

    /// The four directions in random order, each tried at most once
    fn directions(&mut self) -> [Direction; 4] {
        let mut directions = Direction::ALL;
        directions.shuffle(&mut self.rng);
        directions
    }

    fn step_fish(&mut self, fish: &FishRef, origin: Position) {
        for direction in self.directions() {
            match self.try_move_fish(fish, origin, direction) {
                Attempt::Blocked => continue,
                Attempt::Moved | Attempt::Gone => return,
            }
        }
        self.stats.stranded += 1;
    }

    fn step_shark(&mut self, shark: &SharkRef, origin: Position) {
        // Hunt first; only wander if no neighbour holds a fish
        for direction in self.directions() {
            match self.try_hunt(shark, origin, direction) {
                Attempt::Blocked => continue,
                Attempt::Moved | Attempt::Gone => return,
            }
        }

        for direction in self.directions() {
            match self.try_roam(shark, origin, direction) {
                Attempt::Blocked => continue,
                Attempt::Moved | Attempt::Gone => return,
            }
        }
        self.stats.stranded += 1;
    }

    /// Take the boundary locks and both cell locks for a move out of `from`.
    /// `None` when the step wraps back onto `from` (a one-cell-wide axis).
    fn lock_move(&self, from: Position, direction: Direction) -> Option<(Position, MoveLocks<'a>)> {
        let grid: &'a Grid = self.grid;
        let partition: &'a Partition = self.partition;

        let to = grid.neighbor(from, direction);
        if to == from {
            return None;
        }

        let boundary = BoundaryGuards::acquire(&partition.crossing_locks(from, to, direction));
        let (src, dst) = grid.lock_pair(from, to);
        Some((to, MoveLocks { src, dst, boundary }))
    }

    fn try_move_fish(&mut self, fish: &FishRef, from: Position, direction: Direction) -> Attempt {
        let Some((to, mut locks)) = self.lock_move(from, direction) else {
            return Attempt::Blocked;
        };
        if !locks.src.holds(fish.id()) {
            return Attempt::Gone;
        }
        if !locks.dst.is_empty() {
            return Attempt::Blocked;
        }

        *locks.dst = Occupant::Fish(fish.clone());
        *locks.src = Occupant::Empty;

        let mut state = fish.state_mut();
        state.position = to;
        state.breed_timer += 1;
        if state.breed_timer >= self.rules.fish_breed_time {
            state.breed_timer = 0;
            let child = Fish::spawn(from);
            *locks.src = Occupant::Fish(child.clone());
            self.intents.fish_added.push(child);
            self.stats.fish_born += 1;
        }

        self.record_move(from, to, &locks);
        Attempt::Moved
    }

    fn try_hunt(&mut self, shark: &SharkRef, from: Position, direction: Direction) -> Attempt {
        let Some((to, mut locks)) = self.lock_move(from, direction) else {
            return Attempt::Blocked;
        };
        if !locks.src.holds(shark.id()) {
            return Attempt::Gone;
        }
        let prey = match &*locks.dst {
            Occupant::Fish(prey) => prey.clone(),
            _ => return Attempt::Blocked,
        };

        *locks.dst = Occupant::Shark(shark.clone());
        *locks.src = Occupant::Empty;
        self.intents.fish_removed.push(prey);
        self.stats.fish_eaten += 1;

        let mut state = shark.state_mut();
        state.position = to;
        state.starve = 0;
        state.breed_timer += 1;
        if state.breed_timer >= self.rules.shark_fed_breed_time {
            state.breed_timer = 0;
            self.breed_shark(&mut locks.src, from);
        }

        self.record_move(from, to, &locks);
        Attempt::Moved
    }

    fn try_roam(&mut self, shark: &SharkRef, from: Position, direction: Direction) -> Attempt {
        let Some((to, mut locks)) = self.lock_move(from, direction) else {
            return Attempt::Blocked;
        };
        if !locks.src.holds(shark.id()) {
            return Attempt::Gone;
        }
        if !locks.dst.is_empty() {
            return Attempt::Blocked;
        }

        *locks.src = Occupant::Empty;

        let mut state = shark.state_mut();
        state.position = to;
        state.starve += 1;
        if state.starve >= self.rules.shark_starve_time {
            // Dies on arrival: the destination stays empty and there is no
            // breeding this step.
            self.intents.sharks_removed.push(shark.clone());
            self.stats.sharks_starved += 1;
        } else {
            *locks.dst = Occupant::Shark(shark.clone());
            state.breed_timer += 1;
            if state.breed_timer >= self.rules.shark_breed_time {
                state.breed_timer = 0;
                self.breed_shark(&mut locks.src, from);
            }
        }

        self.record_move(from, to, &locks);
        Attempt::Moved
    }

    fn breed_shark(&mut self, cell: &mut Occupant, at: Position) {
        let child = Shark::spawn(at);
        *cell = Occupant::Shark(child.clone());
        self.intents.sharks_added.push(child);
        self.stats.sharks_born += 1;
    }

    fn record_move(&mut self, from: Position, to: Position, locks: &MoveLocks<'_>) {
        self.stats.moves += 1;
        if !self.partition.contains(to) {
            self.stats.crossings += 1;
            trace!(
                partition = self.partition.index,
                from = %from,
                to = %to,
                boundary_locks = locks.boundary.len(),
                "Boundary crossing"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::PartitionLayout;
    use crate::registry::Registry;
    use wator_core::{CellKind, SplitStrategy};

    struct Scene {
        grid: Grid,
        layout: PartitionLayout,
        registry: Registry,
    }

    impl Scene {
        fn new(width: i32, height: i32, workers: usize, fish: &[(i32, i32)], sharks: &[(i32, i32)]) -> Self {
            let grid = Grid::new(width, height);
            let layout = PartitionLayout::new(width, height, workers, SplitStrategy::Columns).unwrap();

            let fish: Vec<FishRef> = fish
                .iter()
                .map(|&(x, y)| {
                    let fish = Fish::spawn(Position::new(x, y));
                    *grid.lock(Position::new(x, y)) = Occupant::Fish(fish.clone());
                    fish
                })
                .collect();
            let sharks: Vec<SharkRef> = sharks
                .iter()
                .map(|&(x, y)| {
                    let shark = Shark::spawn(Position::new(x, y));
                    *grid.lock(Position::new(x, y)) = Occupant::Shark(shark.clone());
                    shark
                })
                .collect();

            Self {
                grid,
                layout,
                registry: Registry::from_population(fish, sharks),
            }
        }

        fn run_partition(&self, index: usize, rules: &BreedConfig) -> WorkerReport {
            let snapshot = self.registry.snapshot();
            Worker::new(&self.layout.partitions()[index], &self.grid, rules, 7).run(&snapshot)
        }
    }

    #[test]
    fn test_fish_moves_into_empty_cell() {
        let scene = Scene::new(5, 5, 1, &[(2, 2)], &[]);
        let report = scene.run_partition(0, &BreedConfig::default());

        assert_eq!(report.stats.moves, 1);
        let fish = scene.registry.fish()[0].clone();
        let pos = fish.position();
        assert_ne!(pos, Position::new(2, 2));
        assert!(scene.grid.occupant(pos).holds(fish.id()));
        assert_eq!(scene.grid.kind_at(Position::new(2, 2)), CellKind::Empty);
        assert_eq!(fish.state().breed_timer, 1);
    }

    #[test]
    fn test_fish_leaves_offspring_at_threshold() {
        let scene = Scene::new(5, 5, 1, &[(2, 2)], &[]);
        let fish = scene.registry.fish()[0].clone();
        fish.state_mut().breed_timer = 4;

        let report = scene.run_partition(0, &BreedConfig::default());

        assert_eq!(report.intents.fish_added.len(), 1);
        let child = &report.intents.fish_added[0];
        assert_eq!(child.position(), Position::new(2, 2));
        assert!(scene.grid.occupant(Position::new(2, 2)).holds(child.id()));
        assert_eq!(fish.state().breed_timer, 0);
    }

    #[test]
    fn test_surrounded_fish_stays_put() {
        // 3x3 torus packed with fish: nobody can move
        let cells: Vec<(i32, i32)> = (0..3).flat_map(|y| (0..3).map(move |x| (x, y))).collect();
        let scene = Scene::new(3, 3, 1, &cells, &[]);

        let report = scene.run_partition(0, &BreedConfig::default());
        assert_eq!(report.stats.moves, 0);
        assert_eq!(report.stats.stranded, 9);
        for fish in scene.registry.fish() {
            assert!(scene.grid.occupant(fish.position()).holds(fish.id()));
        }
    }

    #[test]
    fn test_shark_prefers_fish() {
        // 3x1: west of the shark is empty, east is a fish. The fish moves
        // first (into the only empty cell), so the shark finds it either way.
        let scene = Scene::new(3, 1, 1, &[(1, 0)], &[(0, 0)]);
        let report = scene.run_partition(0, &BreedConfig::default());

        assert_eq!(report.intents.fish_removed.len(), 1);
        let shark = scene.registry.sharks()[0].clone();
        assert_eq!(shark.state().starve, 0);
        assert_eq!(shark.state().breed_timer, 1);
        assert!(scene.grid.occupant(shark.position()).holds(shark.id()));
        assert_eq!(scene.grid.render_snapshot().fish_count(), 0);
    }

    #[test]
    fn test_fed_shark_breeds_at_fed_threshold() {
        let scene = Scene::new(2, 1, 1, &[(1, 0)], &[(0, 0)]);
        let shark = scene.registry.sharks()[0].clone();
        shark.state_mut().breed_timer = 4;

        let report = scene.run_partition(0, &BreedConfig::default());

        assert_eq!(report.intents.sharks_added.len(), 1);
        assert_eq!(report.intents.sharks_added[0].position(), Position::new(0, 0));
        assert_eq!(shark.position(), Position::new(1, 0));
        assert_eq!(shark.state().breed_timer, 0);
    }

    #[test]
    fn test_starving_shark_dies_without_breeding() {
        let scene = Scene::new(5, 5, 1, &[], &[(2, 2)]);
        let shark = scene.registry.sharks()[0].clone();
        {
            let mut state = shark.state_mut();
            state.starve = 4;
            state.breed_timer = 5;
        }

        let report = scene.run_partition(0, &BreedConfig::default());

        assert_eq!(report.intents.sharks_removed.len(), 1);
        assert!(report.intents.sharks_added.is_empty());
        assert_eq!(shark.state().breed_timer, 5);
        assert_eq!(scene.grid.render_snapshot().shark_count(), 0);
    }

    #[test]
    fn test_roaming_shark_breeds_at_threshold() {
        let scene = Scene::new(5, 5, 1, &[], &[(2, 2)]);
        let shark = scene.registry.sharks()[0].clone();
        shark.state_mut().breed_timer = 5;

        let report = scene.run_partition(0, &BreedConfig::default());

        assert_eq!(report.intents.sharks_added.len(), 1);
        assert_eq!(shark.state().starve, 1);
        assert_eq!(shark.state().breed_timer, 0);
        assert_eq!(scene.grid.render_snapshot().shark_count(), 2);
    }

    #[test]
    fn test_worker_ignores_other_partitions() {
        let scene = Scene::new(8, 2, 2, &[(1, 0), (6, 1)], &[]);
        let report = scene.run_partition(0, &BreedConfig::default());

        assert_eq!(report.partition, 0);
        assert_eq!(report.stats.moves, 1);
        assert_eq!(scene.grid.kind_at(Position::new(6, 1)), CellKind::Fish);
    }

    #[test]
    fn test_eaten_fish_is_skipped() {
        let scene = Scene::new(4, 1, 1, &[(1, 0)], &[]);
        let fish = scene.registry.fish()[0].clone();
        let snapshot = scene.registry.snapshot();

        // A neighbouring worker's shark took the cell before this worker ran
        let shark = Shark::spawn(Position::new(1, 0));
        *scene.grid.lock(Position::new(1, 0)) = Occupant::Shark(shark);

        let rules = BreedConfig::default();
        let report = Worker::new(&scene.layout.partitions()[0], &scene.grid, &rules, 3).run(&snapshot);
        assert_eq!(report.stats.moves, 0);
        assert_eq!(report.stats.stranded, 0);
        assert_eq!(fish.position(), Position::new(1, 0));
    }
}
