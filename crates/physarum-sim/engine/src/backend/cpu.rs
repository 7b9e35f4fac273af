// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # CPU Backend
//!
//! rayon data-parallel passes over agents and cells. Each `dispatch` is a blocking parallel
//! iterator, so returning from it is the inter-pass barrier.
//!
//! Deposits are written to per-agent slots in parallel and then reduced serially in agent
//! index order, which keeps floating-point sums identical from run to run.

use super::{ComputeBackend, Kernel, PassStats, SimulationBuffers, SimulationParams};
use crate::renderer;
use physarum_sim_kernels::{sensor_positions, step_agent, Result, SimulationError};
use rayon::prelude::*;
use tracing::debug;

/// CPU backend (rayon)
pub struct CpuBackend {
    /// Backend name for logging
    name: String,

    /// Dedicated pool when a thread count was requested; global pool otherwise
    pool: Option<rayon::ThreadPool>,
}

impl CpuBackend {
    /// CPU backend on the global rayon pool
    pub fn new() -> Self {
        Self {
            name: "CPU (rayon)".to_string(),
            pool: None,
        }
    }

    /// CPU backend on a dedicated pool of `threads` workers (0 = global pool)
    pub fn with_threads(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Ok(Self::new());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("physarum-cpu-{}", i))
            .build()
            .map_err(|e| SimulationError::BackendError(format!("Failed to build thread pool: {}", e)))?;
        debug!("[CPU-BACKEND] Dedicated pool with {} threads", threads);
        Ok(Self {
            name: format!("CPU (rayon x{})", threads),
            pool: Some(pool),
        })
    }

    fn agent_update(buffers: &mut SimulationBuffers, params: &SimulationParams, dt: f32) -> PassStats {
        let SimulationBuffers {
            agents,
            trail,
            pending_deposits,
            diagnostics,
            ..
        } = buffers;

        // Sensing positions depend only on the pre-update state
        if diagnostics.is_enabled() {
            diagnostics.begin_tick();
            for (index, agent) in agents.iter().take(diagnostics.agent_limit()).enumerate() {
                diagnostics.record(index, sensor_positions(agent, &params.agent));
            }
        }

        let field = &*trail;
        let agents_rejected: usize = agents
            .par_iter_mut()
            .zip(pending_deposits.par_iter_mut())
            .map(|(agent, slot)| {
                let outcome = step_agent(agent, field, &params.agent, dt);
                *agent = outcome.agent;
                *slot = outcome.deposit;
                outcome.rejected as usize
            })
            .sum();

        if agents_rejected > 0 {
            diagnostics.add_rejected(agents_rejected as u64);
        }

        PassStats {
            agents_rejected,
            deposits_committed: 0,
        }
    }

    fn commit_deposits(buffers: &mut SimulationBuffers) -> PassStats {
        let mut deposits_committed = 0;
        for slot in buffers.pending_deposits.iter_mut() {
            if let Some((cell, amount)) = slot.take() {
                buffers.trail.deposit_at(cell, amount);
                deposits_committed += 1;
            }
        }
        PassStats {
            agents_rejected: 0,
            deposits_committed,
        }
    }

    fn run_kernel(
        kernel: Kernel,
        buffers: &mut SimulationBuffers,
        params: &SimulationParams,
        dt: f32,
    ) -> PassStats {
        match kernel {
            Kernel::AgentUpdate => Self::agent_update(buffers, params, dt),
            Kernel::CommitDeposits => Self::commit_deposits(buffers),
            Kernel::DecayDiffuse => {
                buffers
                    .trail
                    .decay_and_diffuse(params.decay_rate, params.blur_ratio);
                PassStats::default()
            }
            Kernel::Render => {
                renderer::render_frame(&buffers.trail, &buffers.agents, &params.render, &mut buffers.frame);
                PassStats::default()
            }
        }
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuBackend {
    fn backend_name(&self) -> &str {
        &self.name
    }

    fn bind(&mut self, buffers: &SimulationBuffers, _params: &SimulationParams) -> Result<()> {
        if buffers.pending_deposits.len() != buffers.agents.len() {
            return Err(SimulationError::BackendError(format!(
                "deposit slots ({}) do not match agent count ({})",
                buffers.pending_deposits.len(),
                buffers.agents.len()
            )));
        }
        debug!(
            "[CPU-BACKEND] Bound {} agents, {} cells",
            buffers.agents.len(),
            buffers.trail.bounds().cell_count()
        );
        Ok(())
    }

    fn dispatch(
        &mut self,
        kernel: Kernel,
        buffers: &mut SimulationBuffers,
        params: &SimulationParams,
        dt: f32,
    ) -> Result<PassStats> {
        let stats = match &self.pool {
            Some(pool) => pool.install(|| Self::run_kernel(kernel, buffers, params, dt)),
            None => Self::run_kernel(kernel, buffers, params, dt),
        };
        Ok(stats)
    }
}
