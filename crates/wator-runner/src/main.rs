//! Headless Wa-Tor runner: load a config, run for the time budget, report.

mod report;
mod telemetry;

use anyhow::{Context, Result};
use report::ProgressObserver;
use tracing::info;
use wator_core::RunnerConfig;
use wator_world::Simulation;

fn main() -> Result<()> {
    // Load configuration
    let config = match std::env::args().nth(1) {
        Some(path) => RunnerConfig::from_json_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => RunnerConfig::default(),
    };

    telemetry::init_telemetry(config.log_format)?;

    let sim_config = config.simulation.clone();
    info!(
        width = sim_config.width,
        height = sim_config.height,
        workers = sim_config.workers,
        split = ?sim_config.split,
        seed = sim_config.seed,
        "Starting Wa-Tor runner"
    );

    let mut simulation = Simulation::new(sim_config)?;
    let mut observer = ProgressObserver::default();
    let record = simulation.run_with_observer(&mut observer)?;

    info!(
        peak_fish = observer.peak_fish,
        peak_sharks = observer.peak_sharks,
        fish_extinct_at = ?observer.fish_extinct_at,
        sharks_extinct_at = ?observer.sharks_extinct_at,
        "Population summary"
    );

    println!("{}", serde_json::to_string_pretty(&record)?);

    if let Some(path) = &config.results_path {
        report::append_record(path, &record)?;
    }

    Ok(())
}
