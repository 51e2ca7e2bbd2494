//! Tick orchestration: fan out one worker per partition, join, reconcile.

use crate::entity::{Fish, Occupant, Shark};
use crate::grid::Grid;
use crate::partition::PartitionLayout;
use crate::reconcile::{reconcile, ReconcileSummary};
use crate::registry::Registry;
use crate::snapshot::RenderSnapshot;
use crate::worker::{Worker, WorkerReport, WorkerStats};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, instrument};
use wator_core::{EntityId, Error, PerformanceRecord, Position, Result, SimConfig, TickStats};

/// Receives control after every completed tick.
pub trait TickObserver {
    /// Whether [`TickObserver::on_tick`] should be handed a render snapshot
    fn wants_snapshot(&self) -> bool {
        false
    }

    fn on_tick(&mut self, stats: &TickStats, snapshot: Option<&RenderSnapshot>);
}

/// Observer that ignores every tick
#[derive(Debug, Default)]
pub struct NoopObserver;

impl TickObserver for NoopObserver {
    fn on_tick(&mut self, _stats: &TickStats, _snapshot: Option<&RenderSnapshot>) {}
}

pub struct Simulation {
    config: SimConfig,
    grid: Grid,
    registry: Registry,
    layout: PartitionLayout,
    rng: ChaCha8Rng,
    tick: u64,
}

impl Simulation {
    /// Validate `config`, tile the grid and scatter the initial population.
    pub fn new(config: SimConfig) -> Result<Self> {
        let mut sim = Self::empty(config)?;
        sim.scatter_population();
        Ok(sim)
    }

    /// Same as [`Simulation::new`] but with no entities placed.
    pub fn empty(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let layout = PartitionLayout::new(config.width, config.height, config.workers, config.split)?;

        info!(
            width = config.width,
            height = config.height,
            workers = config.workers,
            columns = layout.columns,
            rows = layout.rows,
            boundary_locks = layout.boundary_lock_count(),
            "Partitioned grid"
        );

        Ok(Self {
            grid: Grid::new(config.width, config.height),
            registry: Registry::new(),
            layout,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            tick: 0,
            config,
        })
    }

    fn scatter_population(&mut self) {
        let mut fish = Vec::new();
        let mut sharks = Vec::new();
        let fish_cutoff = self.config.fish_density_pct;
        let shark_cutoff = fish_cutoff + self.config.shark_density_pct;

        for pos in self.grid.positions() {
            let roll = self.rng.gen_range(0..100u32);
            if roll < fish_cutoff {
                let entity = Fish::spawn(pos);
                *self.grid.lock(pos) = Occupant::Fish(entity.clone());
                fish.push(entity);
            } else if roll < shark_cutoff {
                let entity = Shark::spawn(pos);
                *self.grid.lock(pos) = Occupant::Shark(entity.clone());
                sharks.push(entity);
            }
        }

        info!(fish = fish.len(), sharks = sharks.len(), "Scattered initial population");
        self.registry = Registry::from_population(fish, sharks);
    }

    /// Place a fish on an empty cell between ticks.
    pub fn spawn_fish(&mut self, pos: Position) -> Result<EntityId> {
        let pos = self.grid.wrap(pos);
        let mut cell = self.grid.lock(pos);
        if !cell.is_empty() {
            return Err(Error::InvalidState(format!("cell {} is occupied", pos)));
        }
        let fish = Fish::spawn(pos);
        *cell = Occupant::Fish(fish.clone());
        drop(cell);

        let id = fish.id();
        self.registry.fish_list().write().push(fish);
        Ok(id)
    }

    /// Place a shark on an empty cell between ticks.
    pub fn spawn_shark(&mut self, pos: Position) -> Result<EntityId> {
        let pos = self.grid.wrap(pos);
        let mut cell = self.grid.lock(pos);
        if !cell.is_empty() {
            return Err(Error::InvalidState(format!("cell {} is occupied", pos)));
        }
        let shark = Shark::spawn(pos);
        *cell = Occupant::Shark(shark.clone());
        drop(cell);

        let id = shark.id();
        self.registry.shark_list().write().push(shark);
        Ok(id)
    }

    /// Run one full tick: snapshot, parallel workers, barrier, reconcile.
    pub fn step(&mut self) -> Result<TickStats> {
        let snapshot = self.registry.snapshot();
        let seeds: Vec<u64> = (0..self.layout.len()).map(|_| self.rng.gen()).collect();

        let grid = &self.grid;
        let rules = &self.config.breeding;
        let snapshot = &snapshot;

        let reports: Vec<WorkerReport> = thread::scope(|scope| {
            let handles = self
                .layout
                .partitions()
                .iter()
                .zip(seeds)
                .map(|(partition, seed)| {
                    thread::Builder::new()
                        .name(format!("wator-worker-{}", partition.index))
                        .spawn_scoped(scope, move || Worker::new(partition, grid, rules, seed).run(snapshot))
                })
                .collect::<std::io::Result<Vec<_>>>()?;

            // Barrier: every worker finishes before anything is reconciled
            Ok::<_, Error>(
                handles
                    .into_iter()
                    .map(|handle| match handle.join() {
                        Ok(report) => report,
                        Err(panic) => std::panic::resume_unwind(panic),
                    })
                    .collect(),
            )
        })?;

        let mut totals = WorkerStats::default();
        let mut intents = Vec::with_capacity(reports.len());
        for report in reports {
            accumulate(&mut totals, &report.stats);
            intents.push(report.intents);
        }

        let summary = reconcile(&self.registry, intents);
        self.tick += 1;

        if self.config.verify_invariants {
            self.verify_consistency()?;
        }

        let stats = self.tick_stats(&totals, &summary);
        debug!(
            tick = stats.tick,
            fish = stats.fish,
            sharks = stats.sharks,
            moves = stats.moves,
            crossings = stats.crossings,
            stillborn = summary.fish.stillborn,
            "Tick reconciled"
        );

        if self.config.log_interval > 0 && self.tick % self.config.log_interval == 0 {
            self.emit_population_metrics(&stats);
        }

        Ok(stats)
    }

    /// Run until the time budget (or tick cap) is spent.
    pub fn run(&mut self) -> Result<PerformanceRecord> {
        self.run_with_observer(&mut NoopObserver)
    }

    /// Run until the time budget (or tick cap) is spent, reporting each tick
    /// to `observer`. A tick that has started always completes.
    #[instrument(skip(self, observer), fields(workers = self.config.workers))]
    pub fn run_with_observer(&mut self, observer: &mut dyn TickObserver) -> Result<PerformanceRecord> {
        let budget = self.config.run_duration();
        let start_tick = self.tick;
        info!(
            budget_ms = self.config.run_duration_ms,
            max_ticks = ?self.config.max_ticks,
            "Starting simulation"
        );

        let started = Instant::now();
        loop {
            let ran = self.tick - start_tick;
            if let Some(max_ticks) = self.config.max_ticks {
                if ran >= max_ticks {
                    break;
                }
            }
            if self.config.run_duration_ms > 0 && started.elapsed() >= budget {
                break;
            }

            let stats = self.step()?;
            if observer.wants_snapshot() {
                let frame = self.render_snapshot();
                observer.on_tick(&stats, Some(&frame));
            } else {
                observer.on_tick(&stats, None);
            }
        }

        let record = PerformanceRecord::new(
            self.tick - start_tick,
            started.elapsed(),
            self.layout.len(),
            self.grid.len(),
            self.registry.fish_count(),
            self.registry.shark_count(),
        );

        info!(
            event = "run_summary",
            ticks = record.ticks,
            elapsed_secs = record.elapsed_secs,
            ticks_per_second = format!("{:.2}", record.ticks_per_second),
            final_fish = record.final_fish,
            final_sharks = record.final_sharks,
            "🏁 Simulation complete"
        );

        Ok(record)
    }

    /// Check that grid and registry agree one-to-one.
    pub fn verify_consistency(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let mut listed = 0usize;

        for fish in self.registry.fish() {
            let pos = fish.position();
            if !seen.insert(fish.id()) {
                return Err(Error::InvalidState(format!("fish {} listed twice", fish.id())));
            }
            if !self.grid.occupant(pos).holds(fish.id()) {
                return Err(Error::InvalidState(format!(
                    "fish {} is not in its cell {}",
                    fish.id(),
                    pos
                )));
            }
            listed += 1;
        }

        for shark in self.registry.sharks() {
            let pos = shark.position();
            if !seen.insert(shark.id()) {
                return Err(Error::InvalidState(format!("shark {} listed twice", shark.id())));
            }
            if !self.grid.occupant(pos).holds(shark.id()) {
                return Err(Error::InvalidState(format!(
                    "shark {} is not in its cell {}",
                    shark.id(),
                    pos
                )));
            }
            listed += 1;
        }

        // Each listed entity sits in its own cell, so equal counts leave no
        // orphan on the grid.
        let occupied = self
            .grid
            .positions()
            .filter(|&pos| !self.grid.occupant(pos).is_empty())
            .count();
        if occupied != listed {
            return Err(Error::InvalidState(format!(
                "{} occupied cells but {} registered entities",
                occupied, listed
            )));
        }

        Ok(())
    }

    pub fn render_snapshot(&self) -> RenderSnapshot {
        self.grid.render_snapshot()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn layout(&self) -> &PartitionLayout {
        &self.layout
    }

    pub fn fish_count(&self) -> usize {
        self.registry.fish_count()
    }

    pub fn shark_count(&self) -> usize {
        self.registry.shark_count()
    }

    fn tick_stats(&self, totals: &WorkerStats, summary: &ReconcileSummary) -> TickStats {
        TickStats {
            tick: self.tick,
            fish: self.registry.fish_count(),
            sharks: self.registry.shark_count(),
            fish_born: summary.fish.added,
            sharks_born: summary.sharks.added,
            fish_eaten: totals.fish_eaten,
            sharks_starved: totals.sharks_starved,
            moves: totals.moves,
            crossings: totals.crossings,
        }
    }

    fn emit_population_metrics(&self, stats: &TickStats) {
        info!(
            event = "population_metrics",
            tick = stats.tick,
            fish = stats.fish,
            sharks = stats.sharks,
            fish_born = stats.fish_born,
            sharks_born = stats.sharks_born,
            fish_eaten = stats.fish_eaten,
            sharks_starved = stats.sharks_starved,
            crossings = stats.crossings,
            "Population metrics snapshot"
        );
    }
}

fn accumulate(totals: &mut WorkerStats, stats: &WorkerStats) {
    totals.moves += stats.moves;
    totals.crossings += stats.crossings;
    totals.fish_born += stats.fish_born;
    totals.sharks_born += stats.sharks_born;
    totals.fish_eaten += stats.fish_eaten;
    totals.sharks_starved += stats.sharks_starved;
    totals.stranded += stats.stranded;
}
