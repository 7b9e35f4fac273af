// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! # Physarum Simulation Engine
//!
//! Staged tick pipeline over the platform-agnostic kernels.
//!
//! ## Per tick
//! 1. **AgentUpdate** - every agent senses the committed field, turns, moves; deposits are buffered
//! 2. **CommitDeposits** - buffered deposits are added to the field
//! 3. **DecayDiffuse** - every cell decays and blends with its neighborhood (double-buffered)
//! 4. **Render** - field + agents → RGBA8 frame for the presentation surface
//!
//! ## Architecture
//! - Compute backends behind [`ComputeBackend`]: rayon on CPU, WGPU behind the `gpu` feature
//! - One explicit [`Simulation`] context; no global state
//! - [`TickLoopRunner`] for a background loop with live parameter updates

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backend;
pub mod clock;
pub mod diagnostics;
pub mod parameter_update_queue;
pub mod renderer;
pub mod simulation;
pub mod surface;
pub mod tick_loop_runner;

pub use backend::*;
pub use clock::SimulationClock;
pub use diagnostics::{DiagnosticSample, DiagnosticsChannel, MAX_AGENT_LIMIT};
pub use parameter_update_queue::{ParameterUpdate, ParameterUpdateQueue};
pub use simulation::{Simulation, SimulationSettings, TickReport};
pub use surface::{LatestFrameSurface, PresentationSurface};
pub use tick_loop_runner::TickLoopRunner;

use serde::Serialize;

/// Simulation performance statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationStats {
    pub total_ticks: u64,
    pub total_processing_time_us: u64,
    pub last_tick_us: f64,
    pub max_tick_us: f64,
    /// Agent updates rejected for producing a non-finite state
    pub total_agents_rejected: u64,
}

impl SimulationStats {
    pub fn record_tick(&mut self, timing: &TickTiming, agents_rejected: usize) {
        self.total_ticks += 1;
        self.total_processing_time_us += timing.total_us as u64;
        self.last_tick_us = timing.total_us;
        self.max_tick_us = self.max_tick_us.max(timing.total_us);
        self.total_agents_rejected += agents_rejected as u64;
    }

    /// Get average processing time per tick (microseconds)
    pub fn avg_tick_time_us(&self) -> f64 {
        if self.total_ticks == 0 {
            0.0
        } else {
            self.total_processing_time_us as f64 / self.total_ticks as f64
        }
    }

    /// Throughput ceiling implied by the average tick time
    pub fn max_ticks_per_second(&self) -> f64 {
        let avg = self.avg_tick_time_us();
        if avg <= 0.0 {
            0.0
        } else {
            1_000_000.0 / avg
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_averages() {
        let mut stats = SimulationStats::default();
        assert_eq!(stats.avg_tick_time_us(), 0.0);
        assert_eq!(stats.max_ticks_per_second(), 0.0);

        for us in [1000.0, 3000.0] {
            let timing = TickTiming {
                total_us: us,
                ..Default::default()
            };
            stats.record_tick(&timing, 1);
        }
        assert_eq!(stats.total_ticks, 2);
        assert_eq!(stats.avg_tick_time_us(), 2000.0);
        assert_eq!(stats.max_ticks_per_second(), 500.0);
        assert_eq!(stats.max_tick_us, 3000.0);
        assert_eq!(stats.last_tick_us, 3000.0);
        assert_eq!(stats.total_agents_rejected, 2);
    }
}
