// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Conversion from the TOML configuration to engine settings

use physarum_config::PhysarumConfig;
use physarum_observability::LoggingOptions;
use physarum_sim_engine::{BackendType, SimulationClock, SimulationParams, SimulationSettings};
use physarum_sim_kernels::{AgentParams, BoundaryPolicy, EdgeTopology, RenderParams, Result, Rgba};

/// Build creation-time settings. Names (boundary, backend) are parsed here;
/// numeric ranges are checked again by `Simulation::new`.
pub fn simulation_settings(config: &PhysarumConfig) -> Result<SimulationSettings> {
    let boundary: BoundaryPolicy = config.agents.boundary.parse()?;
    let backend: BackendType = config.compute.backend.parse()?;

    let params = SimulationParams {
        decay_rate: config.trail.decay_rate,
        blur_ratio: config.trail.blur_ratio,
        agent: AgentParams {
            fov_degrees: config.agents.fov_degrees,
            turn_ratio: config.agents.turn_ratio,
            sensor_distance: config.agents.sensor_distance,
            deposit_amount: config.agents.deposit_amount,
            boundary,
        },
        render: RenderParams {
            agent_radius: config.render.agent_radius,
            agent_color: Rgba::from_array(config.render.agent_color),
            trail_color: Rgba::from_array(config.render.trail_color),
            background_color: Rgba::from_array(config.render.background_color),
        },
    };

    Ok(SimulationSettings {
        num_agents: config.simulation.num_agents,
        width: config.simulation.width,
        height: config.simulation.height,
        seed: config.simulation.seed,
        min_agent_velocity: config.agents.min_velocity,
        max_agent_velocity: config.agents.max_velocity,
        blur_radius: config.trail.blur_radius,
        edge_topology: if config.trail.wrap_edges {
            EdgeTopology::Wrapped
        } else {
            EdgeTopology::Clamped
        },
        params,
        diagnostics_enabled: config.diagnostics.enabled,
        diagnostics_agent_limit: config.diagnostics.agent_limit,
        backend,
        threads: config.compute.threads,
    })
}

pub fn simulation_clock(config: &PhysarumConfig) -> Result<SimulationClock> {
    SimulationClock::new(config.simulation.fixed_delta_time)
}

/// `log_dir` is only passed on when file logging is switched on
pub fn logging_options(config: &PhysarumConfig) -> LoggingOptions {
    LoggingOptions {
        default_level: config.logging.level.to_lowercase(),
        log_dir: config
            .logging
            .file_logging
            .then(|| config.logging.log_dir.clone()),
        ..LoggingOptions::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_convert() {
        let settings = simulation_settings(&PhysarumConfig::default()).unwrap();
        assert_eq!(settings.num_agents, 10_000);
        assert_eq!(settings.params.agent.boundary, BoundaryPolicy::Bounce);
        assert_eq!(settings.edge_topology, EdgeTopology::Clamped);
        assert_eq!(settings.backend, BackendType::CPU);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_wrap_and_colors_carried() {
        let mut config = PhysarumConfig::default();
        config.agents.boundary = "WRAP".to_string();
        config.trail.wrap_edges = true;
        config.render.trail_color = [0.2, 0.4, 0.6, 1.0];

        let settings = simulation_settings(&config).unwrap();
        assert_eq!(settings.params.agent.boundary, BoundaryPolicy::Wrap);
        assert_eq!(settings.edge_topology, EdgeTopology::Wrapped);
        assert_eq!(settings.params.render.trail_color.to_array(), [0.2, 0.4, 0.6, 1.0]);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let mut config = PhysarumConfig::default();
        config.compute.backend = "abacus".to_string();
        assert!(simulation_settings(&config).is_err());
    }

    #[test]
    fn test_logging_options() {
        let mut config = PhysarumConfig::default();
        assert!(logging_options(&config).log_dir.is_none());

        config.logging.file_logging = true;
        config.logging.level = "DEBUG".to_string();
        let options = logging_options(&config);
        assert_eq!(options.log_dir, Some(config.logging.log_dir.clone()));
        assert_eq!(options.default_level, "debug");
    }
}
