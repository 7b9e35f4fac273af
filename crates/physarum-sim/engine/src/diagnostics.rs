// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Optional read-back of per-agent sensing positions for a bounded subset of agents.
//!
//! Nothing in the simulation reads this channel; toggling it never changes the trajectory.

use physarum_sim_kernels::{Vec2, SENSOR_COUNT};
use serde::Serialize;

/// Default number of agents sampled
pub const DEFAULT_AGENT_LIMIT: usize = 50;

/// Largest accepted agent limit
pub const MAX_AGENT_LIMIT: usize = 1 << 20;

/// Sensing positions of one agent for the most recent tick, `[left, forward, right]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiagnosticSample {
    pub agent_index: usize,
    pub positions: [Vec2; SENSOR_COUNT],
}

#[derive(Debug, Clone)]
pub struct DiagnosticsChannel {
    enabled: bool,
    agent_limit: usize,
    samples: Vec<DiagnosticSample>,
    rejected_total: u64,
}

impl DiagnosticsChannel {
    /// Buffer capacity is bounded by [`MAX_AGENT_LIMIT`]; larger limits still record, growing on demand.
    pub fn new(enabled: bool, agent_limit: usize) -> Self {
        Self {
            enabled,
            agent_limit,
            samples: Vec::with_capacity(if enabled { agent_limit.min(MAX_AGENT_LIMIT) } else { 0 }),
            rejected_total: 0,
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, DEFAULT_AGENT_LIMIT)
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.samples.clear();
        }
    }

    #[inline]
    pub fn agent_limit(&self) -> usize {
        self.agent_limit
    }

    /// Drop the previous tick's samples.
    pub fn begin_tick(&mut self) {
        self.samples.clear();
    }

    pub fn record(&mut self, agent_index: usize, positions: [Vec2; SENSOR_COUNT]) {
        if self.enabled && agent_index < self.agent_limit {
            self.samples.push(DiagnosticSample {
                agent_index,
                positions,
            });
        }
    }

    pub fn samples(&self) -> &[DiagnosticSample] {
        &self.samples
    }

    /// All recorded positions as `(x, y)` pairs, agent-major.
    pub fn flattened(&self) -> Vec<(f32, f32)> {
        self.samples
            .iter()
            .flat_map(|s| s.positions.iter().map(|p| (p.x, p.y)))
            .collect()
    }

    pub fn add_rejected(&mut self, count: u64) {
        self.rejected_total += count;
    }

    /// Agent updates rejected for producing a non-finite state, since creation.
    /// Counted whether or not sampling is enabled.
    pub fn rejected_total(&self) -> u64 {
        self.rejected_total
    }
}

impl Default for DiagnosticsChannel {
    fn default() -> Self {
        Self::disabled()
    }
}
