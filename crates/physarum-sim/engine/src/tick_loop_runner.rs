// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Tick Loop Runner
//!
//! Runs the simulation on a dedicated thread at a target tick rate.
//!
//! - Tick rate can be changed while running (read once per iteration)
//! - Parameter updates are drained between ticks, never during one
//! - Stop is responsive: sleeps are chunked to 50ms and re-check the running flag
//! - The tick counter is cached in an atomic so callers never wait on the simulation lock
//!
//! Each iteration always advances by the clock's fixed `dt`; the tick rate only throttles
//! wall time.

use crate::clock::SimulationClock;
use crate::parameter_update_queue::ParameterUpdateQueue;
use crate::simulation::Simulation;
use crate::surface::PresentationSurface;
use parking_lot::Mutex;
use physarum_sim_kernels::{Result, SimulationError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Maximum single sleep while throttling; bounds stop latency
const SLEEP_CHUNK: Duration = Duration::from_millis(50);

/// Tick loop runner - manages the background simulation loop
pub struct TickLoopRunner {
    /// Shared simulation context
    simulation: Arc<Mutex<Simulation>>,
    /// Target tick rate in Hz (shared with the loop thread for live updates)
    tick_rate_hz: Arc<Mutex<f64>>,
    /// Fixed-step driver
    clock: SimulationClock,
    /// Running flag (atomic for thread-safe stop)
    running: Arc<AtomicBool>,
    /// Thread handle (for graceful shutdown)
    thread_handle: Option<thread::JoinHandle<()>>,
    /// Cached tick count for lock-free reads
    cached_tick_count: Arc<AtomicU64>,
    /// Stop on its own after this many total ticks
    max_ticks: Option<u64>,
    /// Receives every frame (None = no presentation)
    surface: Option<Arc<Mutex<Box<dyn PresentationSurface>>>>,
    /// Error that stopped the loop, if any
    last_error: Arc<Mutex<Option<SimulationError>>>,
    /// Control threads push here; the loop consumes between ticks
    pub parameter_queue: ParameterUpdateQueue,
}

impl TickLoopRunner {
    /// Create a runner for `simulation`, ticking at `tick_rate_hz` with the clock's fixed `dt`.
    pub fn new(simulation: Simulation, clock: SimulationClock, tick_rate_hz: f64) -> Result<Self> {
        validate_tick_rate(tick_rate_hz)?;
        let tick_count = simulation.tick_count();
        Ok(Self {
            simulation: Arc::new(Mutex::new(simulation)),
            tick_rate_hz: Arc::new(Mutex::new(tick_rate_hz)),
            clock,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            cached_tick_count: Arc::new(AtomicU64::new(tick_count)),
            max_ticks: None,
            surface: None,
            last_error: Arc::new(Mutex::new(None)),
            parameter_queue: ParameterUpdateQueue::new(),
        })
    }

    pub fn set_surface(&mut self, surface: Box<dyn PresentationSurface>) {
        self.surface = Some(Arc::new(Mutex::new(surface)));
    }

    pub fn set_max_ticks(&mut self, max_ticks: Option<u64>) {
        self.max_ticks = max_ticks;
    }

    /// Set tick rate (can be called while running - thread-safe)
    pub fn set_tick_rate(&self, tick_rate_hz: f64) -> Result<()> {
        validate_tick_rate(tick_rate_hz)?;
        *self.tick_rate_hz.lock() = tick_rate_hz;
        info!("[TICK-LOOP] Tick rate set to {:.2} Hz", tick_rate_hz);
        Ok(())
    }

    pub fn get_tick_rate(&self) -> f64 {
        *self.tick_rate_hz.lock()
    }

    /// Start the tick loop in a background thread
    pub fn start(&mut self) -> Result<()> {
        if self.running.load(Ordering::Acquire) {
            return Err(SimulationError::BackendError("Tick loop already running".to_string()));
        }
        // A previous run that stopped on its own leaves a finished handle behind
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }

        info!(
            "[TICK-LOOP] Starting tick loop at {:.2} Hz (dt = {}s)",
            self.get_tick_rate(),
            self.clock.fixed_dt()
        );
        *self.last_error.lock() = None;
        self.running.store(true, Ordering::Release);

        let ctx = LoopContext {
            simulation: self.simulation.clone(),
            tick_rate_hz: self.tick_rate_hz.clone(),
            clock: self.clock.clone(),
            running: self.running.clone(),
            cached_tick_count: self.cached_tick_count.clone(),
            max_ticks: self.max_ticks,
            surface: self.surface.clone(),
            last_error: self.last_error.clone(),
            parameter_queue: self.parameter_queue.clone(),
        };

        let spawned = thread::Builder::new()
            .name("physarum-tick-loop".to_string())
            .spawn(move || tick_loop(ctx));

        match spawned {
            Ok(handle) => {
                self.thread_handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                Err(SimulationError::BackendError(format!(
                    "Failed to spawn tick loop thread: {}",
                    e
                )))
            }
        }
    }

    /// Stop the tick loop gracefully, waiting up to 2 seconds for the thread to finish.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);

        let Some(handle) = self.thread_handle.take() else {
            return;
        };

        info!("[TICK-LOOP] Stopping tick loop...");
        let stop_timeout = Duration::from_secs(2);
        let (tx, rx) = std::sync::mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(handle.join());
        });

        match rx.recv_timeout(stop_timeout) {
            Ok(Ok(())) => info!("[TICK-LOOP] Tick loop stopped cleanly"),
            Ok(Err(_)) => warn!("[TICK-LOOP] Tick loop thread panicked during shutdown"),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                warn!(
                    "[TICK-LOOP] Tick loop did not stop within {:?}, proceeding with shutdown",
                    stop_timeout
                );
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                warn!("[TICK-LOOP] Join thread disconnected unexpectedly");
            }
        }
    }

    /// Block until the loop exits on its own (max ticks or error).
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!("[TICK-LOOP] Tick loop thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Current tick count (lock-free atomic read)
    pub fn get_tick_count(&self) -> u64 {
        self.cached_tick_count.load(Ordering::Relaxed)
    }

    /// Error that stopped the loop, if any
    pub fn last_error(&self) -> Option<SimulationError> {
        self.last_error.lock().clone()
    }

    /// Shared simulation (lock only between ticks for snapshots)
    pub fn simulation(&self) -> Arc<Mutex<Simulation>> {
        self.simulation.clone()
    }
}

impl Drop for TickLoopRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn validate_tick_rate(tick_rate_hz: f64) -> Result<()> {
    if !tick_rate_hz.is_finite() || tick_rate_hz <= 0.0 {
        return Err(SimulationError::InvalidParameter {
            name: "tick_rate_hz".to_string(),
            reason: format!("must be positive, got {}", tick_rate_hz),
        });
    }
    Ok(())
}

struct LoopContext {
    simulation: Arc<Mutex<Simulation>>,
    tick_rate_hz: Arc<Mutex<f64>>,
    clock: SimulationClock,
    running: Arc<AtomicBool>,
    cached_tick_count: Arc<AtomicU64>,
    max_ticks: Option<u64>,
    surface: Option<Arc<Mutex<Box<dyn PresentationSurface>>>>,
    last_error: Arc<Mutex<Option<SimulationError>>>,
    parameter_queue: ParameterUpdateQueue,
}

fn tick_loop(ctx: LoopContext) {
    let mut ticks_this_run = 0u64;

    while ctx.running.load(Ordering::Acquire) {
        // A restarted runner may already be at its budget
        if let Some(max) = ctx.max_ticks {
            let completed = ctx.simulation.lock().tick_count();
            if completed >= max {
                info!("[TICK-LOOP] Max ticks ({}) already reached", max);
                break;
            }
        }

        let tick_start = Instant::now();

        match run_one_tick(&ctx) {
            Ok(tick) => {
                ticks_this_run += 1;
                if ctx.max_ticks.is_some_and(|max| tick >= max) {
                    info!("[TICK-LOOP] Reached max ticks ({})", tick);
                    break;
                }
            }
            Err(e) => {
                error!("[TICK-LOOP] Tick failed, stopping: {}", e);
                *ctx.last_error.lock() = Some(e);
                break;
            }
        }

        // Read the rate every iteration so live changes apply to the next sleep
        let interval = Duration::from_secs_f64(1.0 / *ctx.tick_rate_hz.lock());
        let target_time = tick_start + interval;
        let now = Instant::now();
        if now > target_time {
            let overshoot = now.duration_since(target_time);
            if overshoot > SLEEP_CHUNK {
                warn!(
                    "[TICK-LOOP] Iteration overshoot: {:.2}ms past target",
                    overshoot.as_secs_f64() * 1000.0
                );
            }
            continue;
        }

        while ctx.running.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now >= target_time {
                break;
            }
            thread::sleep((target_time - now).min(SLEEP_CHUNK));
        }
    }

    ctx.running.store(false, Ordering::Release);
    info!("[TICK-LOOP] Main loop stopped after {} ticks", ticks_this_run);
}

/// Apply queued updates, tick, publish. Returns the completed tick number.
fn run_one_tick(ctx: &LoopContext) -> Result<u64> {
    let mut simulation = ctx.simulation.lock();

    for update in ctx.parameter_queue.drain_all() {
        if let Err(e) = simulation.apply_parameter_update(update) {
            warn!("[TICK-LOOP] Rejected parameter update {:?}: {}", update, e);
        }
    }

    let report = ctx.clock.step(&mut simulation)?;
    ctx.cached_tick_count.store(report.tick, Ordering::Relaxed);

    if let Some(surface) = &ctx.surface {
        let mut surface = surface.lock();
        surface.present(simulation.frame(), report.tick)?;
        debug!(
            "[TICK-LOOP] Presented tick {} to {}",
            report.tick,
            surface.surface_name()
        );
    }

    Ok(report.tick)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter_update_queue::ParameterUpdate;
    use crate::simulation::SimulationSettings;
    use crate::surface::LatestFrameSurface;

    fn runner(rate: f64) -> TickLoopRunner {
        let sim = Simulation::new(SimulationSettings {
            num_agents: 16,
            width: 16,
            height: 16,
            ..Default::default()
        })
        .unwrap();
        TickLoopRunner::new(sim, SimulationClock::new(0.05).unwrap(), rate).unwrap()
    }

    #[test]
    fn test_rejects_bad_tick_rate() {
        let r = runner(10.0);
        assert!(r.set_tick_rate(0.0).is_err());
        assert!(r.set_tick_rate(f64::NAN).is_err());
        assert_eq!(r.get_tick_rate(), 10.0);
    }

    #[test]
    fn test_runs_to_max_ticks_and_presents() {
        let mut r = runner(1000.0);
        let surface = LatestFrameSurface::new();
        r.set_surface(Box::new(surface.clone()));
        r.set_max_ticks(Some(5));
        r.start().unwrap();
        r.join();

        assert!(!r.is_running());
        assert_eq!(r.get_tick_count(), 5);
        assert_eq!(surface.latest_tick(), Some(5));
        assert!(r.last_error().is_none());
    }

    #[test]
    fn test_restart_at_budget_runs_no_extra_tick() {
        let mut r = runner(1000.0);
        r.set_max_ticks(Some(3));
        r.start().unwrap();
        r.join();
        assert_eq!(r.get_tick_count(), 3);

        r.start().unwrap();
        r.join();
        assert!(!r.is_running());
        assert_eq!(r.simulation().lock().tick_count(), 3);
        assert_eq!(r.get_tick_count(), 3);
    }

    #[test]
    fn test_stop_is_responsive_at_low_rate() {
        let mut r = runner(0.5);
        r.start().unwrap();
        thread::sleep(Duration::from_millis(100));
        let start = Instant::now();
        r.stop();
        assert!(start.elapsed() < Duration::from_millis(500));
        assert!(!r.is_running());
        assert_eq!(r.get_tick_count(), 1);
    }

    #[test]
    fn test_parameter_updates_applied_between_ticks() {
        let mut r = runner(1000.0);
        r.parameter_queue.push(ParameterUpdate::DecayRate(0.5));
        r.parameter_queue.push(ParameterUpdate::DecayRate(7.0));
        r.set_max_ticks(Some(2));
        r.start().unwrap();
        r.join();

        let sim = r.simulation();
        let sim = sim.lock();
        // The invalid update is rejected, the valid one stays
        assert_eq!(sim.params().decay_rate, 0.5);
        assert!(r.parameter_queue.is_empty());
    }

    #[test]
    fn test_double_start_rejected() {
        let mut r = runner(5.0);
        r.start().unwrap();
        assert!(r.start().is_err());
        r.stop();
    }
}
