//! Configuration types for the simulation.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How the worker count is turned into a `columns x rows` tiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    /// As square as possible, with at least as many columns as rows
    Balanced,
    /// One vertical strip per worker
    Columns,
    /// One horizontal strip per worker
    Rows,
}

impl SplitStrategy {
    /// Factor `workers` into `(columns, rows)`.
    pub fn layout(&self, workers: usize) -> (usize, usize) {
        match self {
            SplitStrategy::Columns => (workers, 1),
            SplitStrategy::Rows => (1, workers),
            SplitStrategy::Balanced => {
                let mut rows = 1;
                let mut candidate = 1;
                while candidate * candidate <= workers {
                    if workers % candidate == 0 {
                        rows = candidate;
                    }
                    candidate += 1;
                }
                (workers / rows, rows)
            }
        }
    }
}

impl Default for SplitStrategy {
    fn default() -> Self {
        SplitStrategy::Balanced
    }
}

/// Breeding and starvation thresholds, counted in successful moves
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreedConfig {
    /// Moves before a fish leaves offspring behind
    pub fish_breed_time: u32,
    /// Moves onto empty cells before a shark leaves offspring behind
    pub shark_breed_time: u32,
    /// Breed threshold checked when a shark has just eaten
    pub shark_fed_breed_time: u32,
    /// Consecutive moves without eating before a shark dies
    pub shark_starve_time: u32,
}

impl Default for BreedConfig {
    fn default() -> Self {
        Self {
            fish_breed_time: 5,
            shark_breed_time: 6,
            shark_fed_breed_time: 5,
            shark_starve_time: 5,
        }
    }
}

/// Simulation run parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Width of the world grid
    pub width: i32,
    /// Height of the world grid
    pub height: i32,
    /// Number of partitions, one worker thread each
    pub workers: usize,
    pub split: SplitStrategy,
    pub breeding: BreedConfig,
    /// Percentage of cells seeded with fish (0 to 100)
    pub fish_density_pct: u32,
    /// Percentage of cells seeded with sharks (0 to 100)
    pub shark_density_pct: u32,
    /// Wall-clock budget; no new tick starts once it is spent
    pub run_duration_ms: u64,
    /// Optional hard cap on the number of ticks
    pub max_ticks: Option<u64>,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Emit population metrics every this many ticks (0 disables)
    pub log_interval: u64,
    /// Check grid/registry consistency after every reconcile
    pub verify_invariants: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 50,
            height: 50,
            workers: 4,
            split: SplitStrategy::Balanced,
            breeding: BreedConfig::default(),
            fish_density_pct: 6,
            shark_density_pct: 1,
            run_duration_ms: 10_000,
            max_ticks: None,
            seed: 0,
            log_interval: 100,
            verify_invariants: false,
        }
    }
}

impl SimConfig {
    pub fn run_duration(&self) -> Duration {
        Duration::from_millis(self.run_duration_ms)
    }

    pub fn grid_cells(&self) -> usize {
        (self.width.max(0) as usize) * (self.height.max(0) as usize)
    }

    /// Reject parameters no run could start with. Partition tiling is
    /// checked separately when the layout is built.
    pub fn validate(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(Error::Configuration(format!(
                "grid dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width.checked_mul(self.height).is_none() {
            return Err(Error::Configuration(format!(
                "a {}x{} grid has too many cells",
                self.width, self.height
            )));
        }
        if self.workers == 0 {
            return Err(Error::Configuration(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.workers > self.grid_cells() {
            return Err(Error::Configuration(format!(
                "{} workers exceed the {} cells of the grid",
                self.workers,
                self.grid_cells()
            )));
        }

        let thresholds = [
            ("fish_breed_time", self.breeding.fish_breed_time),
            ("shark_breed_time", self.breeding.shark_breed_time),
            ("shark_fed_breed_time", self.breeding.shark_fed_breed_time),
            ("shark_starve_time", self.breeding.shark_starve_time),
        ];
        for (name, value) in thresholds {
            if value == 0 {
                return Err(Error::Configuration(format!("{} must be positive", name)));
            }
        }

        if self.fish_density_pct + self.shark_density_pct > 100 {
            return Err(Error::Configuration(format!(
                "fish ({}%) and shark ({}%) densities exceed 100%",
                self.fish_density_pct, self.shark_density_pct
            )));
        }

        if self.run_duration_ms == 0 && self.max_ticks.is_none() {
            return Err(Error::Configuration(
                "run duration must be positive when no tick limit is set".to_string(),
            ));
        }

        Ok(())
    }
}

/// Output format for the runner's log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Headless runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub simulation: SimConfig,
    pub log_format: LogFormat,
    /// Append each performance record as a JSON line to this file
    pub results_path: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            simulation: SimConfig::default(),
            log_format: LogFormat::Pretty,
            results_path: None,
        }
    }
}

impl RunnerConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
