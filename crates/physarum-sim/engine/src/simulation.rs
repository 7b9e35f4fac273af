// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Simulation Context
//!
//! Owns the agents, the trail field, the output frame and the compute backend. There is no
//! ambient state: everything a tick needs is reachable from one [`Simulation`] value.
//!
//! ## Lifecycle
//! 1. [`SimulationSettings::validate`] rejects bad configuration before anything is allocated
//! 2. Agents are seeded from `StdRng::seed_from_u64(seed)`
//! 3. The backend binds the buffers once
//! 4. [`Simulation::tick`] runs AgentUpdate → CommitDeposits → DecayDiffuse → Render

use crate::backend::{
    create_backend, BackendTickResult, BackendType, ComputeBackend, SimulationBuffers, SimulationParams,
    TickTiming,
};
use crate::diagnostics::{DiagnosticsChannel, DEFAULT_AGENT_LIMIT, MAX_AGENT_LIMIT};
use crate::parameter_update_queue::{check_unit_interval, ParameterUpdate};
use crate::SimulationStats;
use image::RgbaImage;
use physarum_sim_kernels::{
    Agent, AgentParams, DomainBounds, EdgeTopology, RenderParams, Result, SimulationError, TrailField,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

/// Ticks slower than this are logged
const SLOW_TICK_US: f64 = 50_000.0;

/// Creation-time configuration.
///
/// Kept independent of `physarum-config`; the application layer converts its TOML
/// configuration into this struct.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    pub num_agents: usize,
    pub width: u32,
    pub height: u32,
    pub seed: u64,
    pub min_agent_velocity: f32,
    pub max_agent_velocity: f32,
    pub blur_radius: u32,
    pub edge_topology: EdgeTopology,
    pub params: SimulationParams,
    pub diagnostics_enabled: bool,
    pub diagnostics_agent_limit: usize,
    pub backend: BackendType,
    /// rayon worker threads for the CPU backend (0 = global pool)
    pub threads: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            num_agents: 10_000,
            width: 512,
            height: 512,
            seed: 0,
            min_agent_velocity: 20.0,
            max_agent_velocity: 40.0,
            blur_radius: 1,
            edge_topology: EdgeTopology::Clamped,
            params: SimulationParams::default(),
            diagnostics_enabled: false,
            diagnostics_agent_limit: DEFAULT_AGENT_LIMIT,
            backend: BackendType::CPU,
            threads: 0,
        }
    }
}

impl SimulationSettings {
    /// Check every creation-time constraint. Fails on the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "width and height must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        let velocities = [self.min_agent_velocity, self.max_agent_velocity];
        if velocities.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(SimulationError::InvalidConfiguration(format!(
                "agent velocities must be finite and non-negative, got [{}, {}]",
                self.min_agent_velocity, self.max_agent_velocity
            )));
        }
        if self.min_agent_velocity > self.max_agent_velocity {
            return Err(SimulationError::InvalidConfiguration(format!(
                "min_agent_velocity ({}) exceeds max_agent_velocity ({})",
                self.min_agent_velocity, self.max_agent_velocity
            )));
        }
        if self.blur_radius == 0 {
            return Err(SimulationError::InvalidConfiguration(
                "blur_radius must be at least 1".to_string(),
            ));
        }
        if self.diagnostics_agent_limit > MAX_AGENT_LIMIT {
            return Err(SimulationError::InvalidConfiguration(format!(
                "diagnostics_agent_limit ({}) exceeds {}",
                self.diagnostics_agent_limit, MAX_AGENT_LIMIT
            )));
        }
        validate_params(&self.params).map_err(|e| SimulationError::InvalidConfiguration(e.to_string()))
    }

    fn bounds(&self) -> Result<DomainBounds> {
        DomainBounds::new(self.width, self.height)
    }
}

fn validate_params(params: &SimulationParams) -> Result<()> {
    check_unit_interval("decay_rate", params.decay_rate)?;
    check_unit_interval("blur_ratio", params.blur_ratio)?;
    params.agent.validate()?;
    validate_render(&params.render)
}

fn validate_render(render: &RenderParams) -> Result<()> {
    if !render.agent_radius.is_finite() || render.agent_radius < 0.0 {
        return Err(SimulationError::InvalidParameter {
            name: "agent_radius".to_string(),
            reason: format!("must be finite and non-negative, got {}", render.agent_radius),
        });
    }
    for (name, color) in [
        ("agent_color", render.agent_color),
        ("trail_color", render.trail_color),
        ("background_color", render.background_color),
    ] {
        if !color.is_valid() {
            return Err(SimulationError::InvalidParameter {
                name: name.to_string(),
                reason: format!("channels must be within [0, 1], got {:?}", color.to_array()),
            });
        }
    }
    Ok(())
}

/// Outcome of one tick
#[derive(Debug, Clone)]
pub struct TickReport {
    /// 1-based index of the tick that just completed
    pub tick: u64,
    pub agents_rejected: usize,
    pub deposits_committed: usize,
    pub timing: TickTiming,
}

/// The simulation context.
pub struct Simulation {
    settings: SimulationSettings,
    params: SimulationParams,
    buffers: SimulationBuffers,
    backend: Box<dyn ComputeBackend>,
    stats: SimulationStats,
}

impl Simulation {
    /// Validate, allocate, seed and bind, using the backend named in the settings.
    pub fn new(settings: SimulationSettings) -> Result<Self> {
        settings.validate()?;
        let backend = create_backend(
            settings.backend,
            settings.num_agents,
            settings.width as usize * settings.height as usize,
            settings.threads,
        )?;
        Self::with_backend(settings, backend)
    }

    /// Same as [`Simulation::new`] with an explicit backend.
    pub fn with_backend(settings: SimulationSettings, backend: Box<dyn ComputeBackend>) -> Result<Self> {
        settings.validate()?;
        let bounds = settings.bounds()?;

        let mut rng = StdRng::seed_from_u64(settings.seed);
        let agents: Vec<Agent> = (0..settings.num_agents)
            .map(|_| {
                Agent::random(
                    &mut rng,
                    bounds,
                    settings.min_agent_velocity,
                    settings.max_agent_velocity,
                )
            })
            .collect();

        Self::assemble(settings, agents, backend)
    }

    /// Start from explicit agents instead of seeded ones. `num_agents` is taken from `agents`.
    ///
    /// Directions are normalized; agents outside the domain or with a degenerate heading or
    /// velocity are rejected.
    pub fn from_agents(mut settings: SimulationSettings, agents: Vec<Agent>) -> Result<Self> {
        settings.num_agents = agents.len();
        settings.validate()?;
        let bounds = settings.bounds()?;

        let agents = agents
            .into_iter()
            .enumerate()
            .map(|(i, agent)| {
                let direction = agent.direction.try_normalized();
                match direction {
                    Some(direction)
                        if bounds.contains(agent.position)
                            && agent.velocity.is_finite()
                            && agent.velocity >= 0.0 =>
                    {
                        Ok(Agent::new(agent.position, direction, agent.velocity))
                    }
                    _ => Err(SimulationError::InvalidConfiguration(format!(
                        "agent {} is invalid: {:?}",
                        i, agent
                    ))),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let backend = create_backend(
            settings.backend,
            agents.len(),
            bounds.cell_count(),
            settings.threads,
        )?;
        Self::assemble(settings, agents, backend)
    }

    fn assemble(
        settings: SimulationSettings,
        agents: Vec<Agent>,
        mut backend: Box<dyn ComputeBackend>,
    ) -> Result<Self> {
        let bounds = settings.bounds()?;
        let trail = TrailField::new(bounds, settings.edge_topology, settings.blur_radius)?;
        let diagnostics = DiagnosticsChannel::new(
            settings.diagnostics_enabled,
            settings.diagnostics_agent_limit.min(agents.len()),
        );
        let buffers = SimulationBuffers::new(agents, trail, diagnostics);
        let params = settings.params;

        backend.bind(&buffers, &params)?;

        info!(
            "[SIM] Created {}x{} simulation: {} agents, seed {}, backend {}",
            settings.width,
            settings.height,
            buffers.agents.len(),
            settings.seed,
            backend.backend_name()
        );

        Ok(Self {
            settings,
            params,
            buffers,
            backend,
            stats: SimulationStats::default(),
        })
    }

    /// Advance one tick of `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> Result<TickReport> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(SimulationError::InvalidParameter {
                name: "delta_time".to_string(),
                reason: format!("must be finite and non-negative, got {}", dt),
            });
        }

        let BackendTickResult { stats, timing } =
            self.backend.process_tick(&mut self.buffers, &self.params, dt)?;

        self.stats.record_tick(&timing, stats.agents_rejected);
        let tick = self.stats.total_ticks;

        if stats.agents_rejected > 0 {
            warn!(
                "[SIM] Tick {}: rejected {} non-finite agent updates",
                tick, stats.agents_rejected
            );
        }
        if timing.total_us > SLOW_TICK_US {
            warn!("[SIM] Slow tick {}: {:.2}ms", tick, timing.total_us / 1000.0);
        }

        Ok(TickReport {
            tick,
            agents_rejected: stats.agents_rejected,
            deposits_committed: stats.deposits_committed,
            timing,
        })
    }

    /// Apply a live update and re-push only the parameters to the backend.
    ///
    /// On error the previous value stays in effect.
    pub fn apply_parameter_update(&mut self, update: ParameterUpdate) -> Result<()> {
        let next = update.apply_to(&self.params)?;
        self.backend.update_parameters(&next)?;
        self.params = next;
        debug!("[SIM] Parameter {} updated: {:?}", update.name(), update);
        Ok(())
    }

    pub fn set_diagnostics_enabled(&mut self, enabled: bool) {
        self.buffers.diagnostics.set_enabled(enabled);
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn agent_params(&self) -> &AgentParams {
        &self.params.agent
    }

    pub fn agents(&self) -> &[Agent] {
        &self.buffers.agents
    }

    pub fn trail(&self) -> &TrailField {
        &self.buffers.trail
    }

    /// Output image of the most recent tick (background only before the first tick)
    pub fn frame(&self) -> &RgbaImage {
        &self.buffers.frame
    }

    pub fn diagnostics(&self) -> &DiagnosticsChannel {
        &self.buffers.diagnostics
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn tick_count(&self) -> u64 {
        self.stats.total_ticks
    }

    pub fn backend_name(&self) -> &str {
        self.backend.backend_name()
    }
}
