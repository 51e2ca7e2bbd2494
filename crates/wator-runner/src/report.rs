//! Run progress tracking and result persistence.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};
use wator_core::{PerformanceRecord, TickStats};
use wator_world::{RenderSnapshot, TickObserver};

/// Tracks population extremes and reports extinctions as they happen.
#[derive(Debug, Default)]
pub struct ProgressObserver {
    pub peak_fish: usize,
    pub peak_sharks: usize,
    pub fish_extinct_at: Option<u64>,
    pub sharks_extinct_at: Option<u64>,
}

impl TickObserver for ProgressObserver {
    fn on_tick(&mut self, stats: &TickStats, _snapshot: Option<&RenderSnapshot>) {
        self.peak_fish = self.peak_fish.max(stats.fish);
        self.peak_sharks = self.peak_sharks.max(stats.sharks);

        if stats.fish == 0 && self.fish_extinct_at.is_none() {
            warn!(tick = stats.tick, "Fish population extinct");
            self.fish_extinct_at = Some(stats.tick);
        }
        if stats.sharks == 0 && self.sharks_extinct_at.is_none() {
            warn!(tick = stats.tick, "Shark population extinct");
            self.sharks_extinct_at = Some(stats.tick);
        }
    }
}

/// Append `record` as a single JSON line to `path`, creating the file if needed.
pub fn append_record(path: impl AsRef<Path>, record: &PerformanceRecord) -> Result<()> {
    let path = path.as_ref();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open results file {}", path.display()))?;

    let line = serde_json::to_string(record)?;
    writeln!(file, "{}", line)?;

    info!(path = %path.display(), "Performance record appended");
    Ok(())
}
