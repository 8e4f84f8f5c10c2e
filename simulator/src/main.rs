mod distributions;
mod simulation;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use cytometry_common::{
    init_tracer,
    tracer::{TracerEngine, TracerOptions},
};
use simulation::Simulation;
use std::{fs::File, io::BufReader, path::PathBuf};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Path to the JSON file describing the particles, channels, conditioning and trigger
    #[clap(long)]
    config: PathBuf,

    /// Seed for every random draw. If omitted, one is taken from the clock and logged
    #[clap(long)]
    seed: Option<u64>,

    /// Log filter to use when RUST_LOG is not set
    #[clap(long, default_value = "info")]
    log_filter: String,

    /// Include the module path of each log line
    #[clap(long)]
    log_targets: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _tracer = init_tracer!(TracerOptions {
        default_filter: Some(cli.log_filter.clone()),
        with_target: cli.log_targets,
    });

    let file = File::open(&cli.config)
        .with_context(|| format!("Cannot open simulation file {}", cli.config.display()))?;
    let simulation: Simulation = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Invalid simulation file {}", cli.config.display()))?;
    simulation.validate()?;

    let seed = cli
        .seed
        .unwrap_or_else(|| u64::from(Utc::now().timestamp_subsec_nanos()));
    info!("Simulating {} channels with seed {seed}", simulation.channels.len());

    let output = simulation.run(seed)?;
    if let Some(warning) = &output.report.warning {
        warn!("Simulation produced no segments: {warning}");
    }
    for channel in output.system.channels() {
        info!(
            "Channel {}: {} samples extracted from {} windows",
            channel.name(),
            channel.segmented_signal().len(),
            channel.segment_ids().last().map_or(0, |&id| id + 1),
        );
    }
    Ok(())
}
