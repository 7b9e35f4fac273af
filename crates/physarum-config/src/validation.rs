// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Every violation is collected so a bad file is reported in one pass.

use crate::{ConfigError, ConfigResult, PhysarumConfig};

const BOUNDARY_NAMES: &[&str] = &["bounce", "clamp", "wrap", "torus"];
const BACKEND_NAMES: &[&str] = &["cpu", "wgpu", "gpu", "auto"];

/// Matches the engine's bound on sampled agents
const MAX_DIAGNOSTICS_AGENT_LIMIT: usize = 1 << 20;

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    NotPositive { field: String },
    OutOfRange { field: String, value: f64, min: f64, max: f64 },
    UnknownName { field: String, value: String, expected: &'static [&'static str] },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotPositive { field } => write!(f, "{} must be positive", field),
            Self::OutOfRange { field, value, min, max } => {
                write!(f, "{} = {} is outside [{}, {}]", field, value, min, max)
            }
            Self::UnknownName { field, value, expected } => {
                write!(f, "{} = '{}' is not one of {}", field, value, expected.join(", "))
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Positive domain size, delta time and tick rate
/// - Velocity range consistency
/// - Rates within `[0, 1]`
/// - Known boundary and backend names
/// - Colors with channels in `[0, 1]`
/// - A bounded diagnostics agent limit
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every violation
pub fn validate_config(config: &PhysarumConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

/// All violations, in section order
pub fn collect_errors(config: &PhysarumConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_simulation(config, &mut errors);
    validate_agents(config, &mut errors);
    validate_trail(config, &mut errors);
    validate_render(config, &mut errors);
    validate_diagnostics(config, &mut errors);
    validate_compute(config, &mut errors);
    errors
}

fn check_unit(field: &str, value: f32, errors: &mut Vec<ConfigValidationError>) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(ConfigValidationError::OutOfRange {
            field: field.to_string(),
            value: value as f64,
            min: 0.0,
            max: 1.0,
        });
    }
}

fn check_non_negative(field: &str, value: f32, errors: &mut Vec<ConfigValidationError>) {
    if !value.is_finite() || value < 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: field.to_string(),
            reason: format!("must be finite and non-negative, got {}", value),
        });
    }
}

fn validate_simulation(config: &PhysarumConfig, errors: &mut Vec<ConfigValidationError>) {
    let sim = &config.simulation;
    if sim.width == 0 {
        errors.push(ConfigValidationError::NotPositive { field: "simulation.width".to_string() });
    }
    if sim.height == 0 {
        errors.push(ConfigValidationError::NotPositive { field: "simulation.height".to_string() });
    }
    if !sim.fixed_delta_time.is_finite() || sim.fixed_delta_time <= 0.0 {
        errors.push(ConfigValidationError::NotPositive {
            field: "simulation.fixed_delta_time".to_string(),
        });
    }
    if !sim.tick_rate_hz.is_finite() || sim.tick_rate_hz <= 0.0 {
        errors.push(ConfigValidationError::NotPositive { field: "simulation.tick_rate_hz".to_string() });
    }
}

fn validate_agents(config: &PhysarumConfig, errors: &mut Vec<ConfigValidationError>) {
    let agents = &config.agents;
    check_non_negative("agents.min_velocity", agents.min_velocity, errors);
    check_non_negative("agents.max_velocity", agents.max_velocity, errors);
    if agents.min_velocity > agents.max_velocity {
        errors.push(ConfigValidationError::InvalidValue {
            field: "agents.min_velocity".to_string(),
            reason: format!(
                "{} exceeds agents.max_velocity ({})",
                agents.min_velocity, agents.max_velocity
            ),
        });
    }
    if !(0.0..=360.0).contains(&agents.fov_degrees) {
        errors.push(ConfigValidationError::OutOfRange {
            field: "agents.fov_degrees".to_string(),
            value: agents.fov_degrees as f64,
            min: 0.0,
            max: 360.0,
        });
    }
    check_non_negative("agents.turn_ratio", agents.turn_ratio, errors);
    check_non_negative("agents.sensor_distance", agents.sensor_distance, errors);
    check_non_negative("agents.deposit_amount", agents.deposit_amount, errors);
    if !BOUNDARY_NAMES.contains(&agents.boundary.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::UnknownName {
            field: "agents.boundary".to_string(),
            value: agents.boundary.clone(),
            expected: BOUNDARY_NAMES,
        });
    }
}

fn validate_trail(config: &PhysarumConfig, errors: &mut Vec<ConfigValidationError>) {
    check_unit("trail.decay_rate", config.trail.decay_rate, errors);
    check_unit("trail.blur_ratio", config.trail.blur_ratio, errors);
    if config.trail.blur_radius == 0 {
        errors.push(ConfigValidationError::NotPositive { field: "trail.blur_radius".to_string() });
    }
}

fn validate_render(config: &PhysarumConfig, errors: &mut Vec<ConfigValidationError>) {
    let render = &config.render;
    check_non_negative("render.agent_radius", render.agent_radius, errors);
    for (field, color) in [
        ("render.agent_color", render.agent_color),
        ("render.trail_color", render.trail_color),
        ("render.background_color", render.background_color),
    ] {
        if color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            errors.push(ConfigValidationError::InvalidValue {
                field: field.to_string(),
                reason: format!("channels must be within [0, 1], got {:?}", color),
            });
        }
    }
}

fn validate_diagnostics(config: &PhysarumConfig, errors: &mut Vec<ConfigValidationError>) {
    let limit = config.diagnostics.agent_limit;
    if limit > MAX_DIAGNOSTICS_AGENT_LIMIT {
        errors.push(ConfigValidationError::OutOfRange {
            field: "diagnostics.agent_limit".to_string(),
            value: limit as f64,
            min: 0.0,
            max: MAX_DIAGNOSTICS_AGENT_LIMIT as f64,
        });
    }
}

fn validate_compute(config: &PhysarumConfig, errors: &mut Vec<ConfigValidationError>) {
    if !BACKEND_NAMES.contains(&config.compute.backend.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::UnknownName {
            field: "compute.backend".to_string(),
            value: config.compute.backend.clone(),
            expected: BACKEND_NAMES,
        });
    }
}
