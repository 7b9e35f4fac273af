// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `physarum_configuration.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PhysarumConfig {
    pub simulation: SimulationConfig,
    pub agents: AgentsConfig,
    pub trail: TrailConfig,
    pub render: RenderConfig,
    pub diagnostics: DiagnosticsConfig,
    pub compute: ComputeConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Domain size, population and timing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub num_agents: usize,
    pub width: u32,
    pub height: u32,
    pub seed: u64,
    /// Seconds advanced per tick
    pub fixed_delta_time: f32,
    /// Tick loop frequency
    pub tick_rate_hz: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_agents: 10_000,
            width: 512,
            height: 512,
            seed: 0,
            fixed_delta_time: 1.0 / 60.0,
            tick_rate_hz: 60.0,
        }
    }
}

/// Agent motion and sensing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub min_velocity: f32,
    pub max_velocity: f32,
    /// Angle between the left and right sensors, degrees
    pub fov_degrees: f32,
    /// Turn rate, degrees per second
    pub turn_ratio: f32,
    pub sensor_distance: f32,
    pub deposit_amount: f32,
    /// "bounce" or "wrap"
    pub boundary: String,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            min_velocity: 20.0,
            max_velocity: 40.0,
            fov_degrees: 45.0,
            turn_ratio: 90.0,
            sensor_distance: 9.0,
            deposit_amount: 1.0,
            boundary: "bounce".to_string(),
        }
    }
}

/// Trail field decay and blur
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrailConfig {
    pub decay_rate: f32,
    pub blur_ratio: f32,
    pub blur_radius: u32,
    pub wrap_edges: bool,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.95,
            blur_ratio: 0.25,
            blur_radius: 1,
            wrap_edges: false,
        }
    }
}

/// Frame colors are RGBA with channels in `[0, 1]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    pub agent_radius: f32,
    pub agent_color: [f32; 4],
    pub trail_color: [f32; 4],
    pub background_color: [f32; 4],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            agent_radius: 1.0,
            agent_color: [1.0, 1.0, 1.0, 1.0],
            trail_color: [1.0, 1.0, 1.0, 1.0],
            background_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
    pub agent_limit: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            agent_limit: 50,
        }
    }
}

/// Compute backend selection
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ComputeConfig {
    /// "cpu", "wgpu" or "auto"
    pub backend: String,
    /// 0 = rayon default
    pub threads: usize,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            backend: "cpu".to_string(),
            threads: 0,
        }
    }
}

/// Headless frame output
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub frame_dir: PathBuf,
    /// Write every Nth frame (0 disables frame output)
    pub frame_interval: u64,
    /// 0 = run until interrupted
    pub max_ticks: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            frame_dir: PathBuf::from("frames"),
            frame_interval: 1,
            max_ticks: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub log_dir: PathBuf,
    pub file_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            file_logging: false,
        }
    }
}
