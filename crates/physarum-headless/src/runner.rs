// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Drives a simulation from configuration until the tick budget is spent or
//! the shutdown flag is cleared.
//!
//! Two modes:
//! - batch: ticks back to back on the calling thread
//! - realtime: a `TickLoopRunner` paces ticks at `simulation.tick_rate_hz`

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use physarum_config::PhysarumConfig;
use physarum_sim_engine::{PresentationSurface, Simulation, SimulationClock, SimulationStats, TickLoopRunner};
use serde::Serialize;
use tracing::info;

use crate::png_surface::PngSequenceSurface;
use crate::settings::{simulation_clock, simulation_settings};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Pace ticks at the configured tick rate instead of running flat out
    pub realtime: bool,
}

/// Printed as JSON when the run ends
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub backend: String,
    pub ticks: u64,
    pub frames_written: u64,
    /// Stopped by the shutdown flag rather than the tick budget
    pub interrupted: bool,
    pub wall_time_s: f64,
    pub stats: SimulationStats,
}

/// Build the simulation described by `config` and run it.
///
/// `output.max_ticks = 0` runs until `running` is cleared.
pub fn run(config: &PhysarumConfig, options: RunOptions, running: Arc<AtomicBool>) -> Result<RunSummary> {
    let settings = simulation_settings(config).context("Invalid simulation settings")?;
    let clock = simulation_clock(config).context("Invalid fixed_delta_time")?;
    let simulation = Simulation::new(settings).context("Failed to create simulation")?;

    let surface = match config.output.frame_interval {
        0 => None,
        interval => Some(
            PngSequenceSurface::new(&config.output.frame_dir, interval).context("Failed to prepare frame output")?,
        ),
    };
    let frames_written = surface
        .as_ref()
        .map(PngSequenceSurface::frames_written)
        .unwrap_or_else(|| Arc::new(AtomicU64::new(0)));
    let max_ticks = (config.output.max_ticks > 0).then_some(config.output.max_ticks);

    info!(
        "[HEADLESS] Running {} agents on {}x{} ({}, {})",
        config.simulation.num_agents,
        config.simulation.width,
        config.simulation.height,
        simulation.backend_name(),
        if options.realtime { "realtime" } else { "batch" }
    );
    if let Some(surface) = &surface {
        info!("[HEADLESS] Writing frames to {}", surface.dir().display());
    }

    let started = Instant::now();
    let (backend, stats, interrupted) = if options.realtime {
        run_realtime(simulation, clock, config.simulation.tick_rate_hz, surface, max_ticks, &running)?
    } else {
        let mut simulation = simulation;
        let interrupted = run_batch(&mut simulation, &clock, surface, max_ticks, &running)?;
        (simulation.backend_name().to_string(), simulation.stats().clone(), interrupted)
    };

    let summary = RunSummary {
        backend,
        ticks: stats.total_ticks,
        frames_written: frames_written.load(Ordering::Relaxed),
        interrupted,
        wall_time_s: started.elapsed().as_secs_f64(),
        stats,
    };
    info!(
        "[HEADLESS] Finished after {} ticks ({:.1} us/tick avg)",
        summary.ticks,
        summary.stats.avg_tick_time_us()
    );
    Ok(summary)
}

/// Returns whether the run was interrupted
fn run_batch(
    simulation: &mut Simulation,
    clock: &SimulationClock,
    mut surface: Option<PngSequenceSurface>,
    max_ticks: Option<u64>,
    running: &AtomicBool,
) -> Result<bool> {
    loop {
        if max_ticks.is_some_and(|max| simulation.tick_count() >= max) {
            return Ok(false);
        }
        if !running.load(Ordering::Acquire) {
            return Ok(true);
        }
        let report = clock.step(simulation)?;
        if let Some(surface) = surface.as_mut() {
            surface.present(simulation.frame(), report.tick)?;
        }
    }
}

fn run_realtime(
    simulation: Simulation,
    clock: SimulationClock,
    tick_rate_hz: f64,
    surface: Option<PngSequenceSurface>,
    max_ticks: Option<u64>,
    running: &AtomicBool,
) -> Result<(String, SimulationStats, bool)> {
    let mut runner = TickLoopRunner::new(simulation, clock, tick_rate_hz)?;
    if let Some(surface) = surface {
        runner.set_surface(Box::new(surface));
    }
    runner.set_max_ticks(max_ticks);
    runner.start()?;

    let mut interrupted = false;
    while runner.is_running() {
        if !running.load(Ordering::Acquire) {
            interrupted = true;
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    runner.stop();

    if let Some(e) = runner.last_error() {
        return Err(e).context("Tick loop failed");
    }

    let shared = runner.simulation();
    let simulation = shared.lock();
    Ok((simulation.backend_name().to_string(), simulation.stats().clone(), interrupted))
}
