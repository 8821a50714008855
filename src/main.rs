//! Minigame - headless runner for the ECS and fixed-timestep loop
//!
//! Simulates a display at a configurable refresh rate, optionally hides it for
//! a while, and reports how the simulation clock behaved.

mod demo;
mod host;
mod settings;
mod simulation;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::settings::DemoSettings;

fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Starting minigame simulation...");

    let settings = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => DemoSettings::load_from(&path)?,
        None => DemoSettings::load(),
    };

    let report = simulation::run(&settings)?;
    info!(
        frames = report.frames,
        frames_requested = report.frames_requested,
        ticks = report.ticks,
        fps = format_args!("{:.1}", report.fps),
        live_balls = report.live_balls,
        next_entity = %report.next_entity,
        "Simulation finished"
    );
    Ok(())
}
