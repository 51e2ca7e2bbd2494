//! Per-tick statistics and the end-of-run performance record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What one tick did, summed over all workers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickStats {
    /// Tick number, starting at 1 for the first completed tick
    pub tick: u64,
    /// Fish alive after reconciliation
    pub fish: usize,
    /// Sharks alive after reconciliation
    pub sharks: usize,
    pub fish_born: usize,
    pub sharks_born: usize,
    pub fish_eaten: usize,
    pub sharks_starved: usize,
    /// Successful moves of any entity
    pub moves: usize,
    /// Successful moves whose destination lay in another partition
    pub crossings: usize,
}

/// Throughput summary handed to an external reporter after a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub ticks: u64,
    pub elapsed_secs: f64,
    pub ticks_per_second: f64,
    pub workers: usize,
    pub grid_cells: usize,
    pub final_fish: usize,
    pub final_sharks: usize,
    pub recorded_at: DateTime<Utc>,
}

impl PerformanceRecord {
    pub fn new(
        ticks: u64,
        elapsed: Duration,
        workers: usize,
        grid_cells: usize,
        final_fish: usize,
        final_sharks: usize,
    ) -> Self {
        let elapsed_secs = elapsed.as_secs_f64();
        let ticks_per_second = if elapsed_secs > 0.0 {
            ticks as f64 / elapsed_secs
        } else {
            0.0
        };

        Self {
            ticks,
            elapsed_secs,
            ticks_per_second,
            workers,
            grid_cells,
            final_fish,
            final_sharks,
            recorded_at: Utc::now(),
        }
    }
}
