// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Fixed-timestep driver.
//!
//! Every tick uses the same `dt`, so a run is reproducible from the seed and tick count alone.
//! Wall-clock time only decides *how many* ticks to run.

use crate::simulation::{Simulation, TickReport};
use physarum_sim_kernels::{Result, SimulationError};
use std::time::Duration;
use tracing::warn;

/// Default cap on catch-up ticks per [`SimulationClock::advance`]
pub const DEFAULT_MAX_CATCH_UP: u32 = 8;

#[derive(Debug, Clone)]
pub struct SimulationClock {
    fixed_dt: f32,
    accumulator: f64,
    max_catch_up: u32,
}

impl SimulationClock {
    pub fn new(fixed_dt: f32) -> Result<Self> {
        if !fixed_dt.is_finite() || fixed_dt <= 0.0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "fixed_delta_time must be positive, got {}",
                fixed_dt
            )));
        }
        Ok(Self {
            fixed_dt,
            accumulator: 0.0,
            max_catch_up: DEFAULT_MAX_CATCH_UP,
        })
    }

    /// `dt = 1 / tick_rate_hz`
    pub fn from_tick_rate(tick_rate_hz: f64) -> Result<Self> {
        if !tick_rate_hz.is_finite() || tick_rate_hz <= 0.0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "tick_rate_hz must be positive, got {}",
                tick_rate_hz
            )));
        }
        Self::new((1.0 / tick_rate_hz) as f32)
    }

    pub fn with_max_catch_up(mut self, ticks: u32) -> Self {
        self.max_catch_up = ticks.max(1);
        self
    }

    #[inline]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Run exactly one tick.
    pub fn step(&self, simulation: &mut Simulation) -> Result<TickReport> {
        simulation.tick(self.fixed_dt)
    }

    /// Run `ticks` ticks back to back.
    pub fn run(&self, simulation: &mut Simulation, ticks: u64) -> Result<()> {
        for _ in 0..ticks {
            self.step(simulation)?;
        }
        Ok(())
    }

    /// Accumulate wall time and run every whole tick that fits, up to the catch-up cap.
    /// Backlog beyond the cap is dropped.
    pub fn advance(&mut self, simulation: &mut Simulation, elapsed: Duration) -> Result<u32> {
        self.accumulator += elapsed.as_secs_f64();
        let dt = self.fixed_dt as f64;
        let mut ran = 0;
        while self.accumulator >= dt && ran < self.max_catch_up {
            self.step(simulation)?;
            self.accumulator -= dt;
            ran += 1;
        }
        if self.accumulator >= dt {
            warn!(
                "[CLOCK] Dropping {:.1} ticks of backlog after {} catch-up ticks",
                self.accumulator / dt,
                ran
            );
            self.accumulator %= dt;
        }
        Ok(ran)
    }

    /// Fraction of a tick carried over to the next `advance`
    pub fn pending_fraction(&self) -> f32 {
        (self.accumulator / self.fixed_dt as f64) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::SimulationSettings;

    fn sim() -> Simulation {
        Simulation::new(SimulationSettings {
            num_agents: 4,
            width: 8,
            height: 8,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_non_positive_dt() {
        assert!(SimulationClock::new(0.0).is_err());
        assert!(SimulationClock::new(f32::INFINITY).is_err());
        assert!(SimulationClock::from_tick_rate(0.0).is_err());
    }

    #[test]
    fn test_advance_runs_whole_ticks() {
        let mut s = sim();
        let mut clock = SimulationClock::new(0.25).unwrap();
        assert_eq!(clock.advance(&mut s, Duration::from_millis(600)).unwrap(), 2);
        assert!((clock.pending_fraction() - 0.4).abs() < 1e-4);
        assert_eq!(clock.advance(&mut s, Duration::from_millis(200)).unwrap(), 1);
        assert_eq!(s.tick_count(), 3);
    }

    #[test]
    fn test_advance_caps_catch_up() {
        let mut s = sim();
        let mut clock = SimulationClock::new(0.01).unwrap().with_max_catch_up(3);
        assert_eq!(clock.advance(&mut s, Duration::from_secs(1)).unwrap(), 3);
        assert!(clock.pending_fraction() < 1.0);
    }
}
