// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Compute Backend Abstraction
//!
//! Provides a unified interface for the compute backends (CPU, GPU) that run the four
//! per-tick kernels. The simulation context owns the state; the backend is handed the
//! buffers once at `bind` time and then asked to `dispatch` each kernel in order.
//!
//! Every `dispatch` returns only after the pass has fully completed, which is the barrier
//! between stages.

mod cpu;
#[cfg(feature = "gpu")]
mod wgpu_backend;

pub use cpu::CpuBackend;
#[cfg(feature = "gpu")]
pub use wgpu_backend::WgpuBackend;

use crate::diagnostics::DiagnosticsChannel;
use image::RgbaImage;
use physarum_sim_kernels::{Agent, AgentParams, RenderParams, Result, SimulationError, TrailField};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::warn;

/// Passes slower than this are logged
const SLOW_PASS_US: f64 = 20_000.0;

/// The per-tick kernels, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Sense → turn → move → boundary over every agent; deposits are buffered
    AgentUpdate,
    /// Add buffered deposits into the trail field
    CommitDeposits,
    /// Decay + neighborhood blur over every cell
    DecayDiffuse,
    /// Trail field + agents → output image
    Render,
}

impl Kernel {
    pub const PIPELINE: [Kernel; 4] = [
        Kernel::AgentUpdate,
        Kernel::CommitDeposits,
        Kernel::DecayDiffuse,
        Kernel::Render,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Kernel::AgentUpdate => "agent_update",
            Kernel::CommitDeposits => "commit_deposits",
            Kernel::DecayDiffuse => "decay_diffuse",
            Kernel::Render => "render",
        }
    }
}

/// Parameters read by the kernels. Everything here may change between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub decay_rate: f32,
    pub blur_ratio: f32,
    pub agent: AgentParams,
    pub render: RenderParams,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            decay_rate: 0.95,
            blur_ratio: 0.25,
            agent: AgentParams::default(),
            render: RenderParams::default(),
        }
    }
}

/// Host-side simulation state, exclusively owned by the simulation context.
pub struct SimulationBuffers {
    pub agents: Vec<Agent>,
    pub trail: TrailField,
    /// One slot per agent: flat cell index and amount, filled by `AgentUpdate`
    pub pending_deposits: Vec<Option<(usize, f32)>>,
    pub frame: RgbaImage,
    pub diagnostics: DiagnosticsChannel,
}

impl SimulationBuffers {
    pub fn new(agents: Vec<Agent>, trail: TrailField, diagnostics: DiagnosticsChannel) -> Self {
        let bounds = trail.bounds();
        let pending_deposits = vec![None; agents.len()];
        Self {
            agents,
            trail,
            pending_deposits,
            frame: RgbaImage::new(bounds.width, bounds.height),
            diagnostics,
        }
    }
}

/// Counters produced by one kernel pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub agents_rejected: usize,
    pub deposits_committed: usize,
}

impl PassStats {
    fn merge(&mut self, other: PassStats) {
        self.agents_rejected += other.agents_rejected;
        self.deposits_committed += other.deposits_committed;
    }
}

/// Detailed timing breakdown for one tick (microseconds)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickTiming {
    pub agent_update_us: f64,
    pub commit_deposits_us: f64,
    pub decay_diffuse_us: f64,
    pub render_us: f64,
    /// GPU read-back (0 on CPU)
    pub transfer_us: f64,
    pub total_us: f64,
}

impl TickTiming {
    fn record(&mut self, kernel: Kernel, us: f64) {
        match kernel {
            Kernel::AgentUpdate => self.agent_update_us = us,
            Kernel::CommitDeposits => self.commit_deposits_us = us,
            Kernel::DecayDiffuse => self.decay_diffuse_us = us,
            Kernel::Render => self.render_us = us,
        }
    }
}

/// Result of processing one tick on any backend
#[derive(Debug, Clone, Default)]
pub struct BackendTickResult {
    pub stats: PassStats,
    pub timing: TickTiming,
}

/// Compute backend trait - abstracts CPU vs GPU execution
pub trait ComputeBackend: Send {
    /// Get backend type name for logging/debugging
    fn backend_name(&self) -> &str;

    /// Bind the simulation buffers once, before the first tick.
    ///
    /// GPU backends allocate device buffers and upload the initial state here.
    fn bind(&mut self, _buffers: &SimulationBuffers, _params: &SimulationParams) -> Result<()> {
        Ok(())
    }

    /// Re-push parameters after a live update. Buffers are not touched.
    fn update_parameters(&mut self, _params: &SimulationParams) -> Result<()> {
        Ok(())
    }

    /// Run one kernel to completion.
    fn dispatch(
        &mut self,
        kernel: Kernel,
        buffers: &mut SimulationBuffers,
        params: &SimulationParams,
        dt: f32,
    ) -> Result<PassStats>;

    /// Make host buffers reflect the device state after a tick (GPU read-back).
    fn synchronize(&mut self, _buffers: &mut SimulationBuffers) -> Result<PassStats> {
        Ok(PassStats::default())
    }

    /// Process a full tick: the four kernels in order, then synchronize.
    fn process_tick(
        &mut self,
        buffers: &mut SimulationBuffers,
        params: &SimulationParams,
        dt: f32,
    ) -> Result<BackendTickResult> {
        let start = Instant::now();
        let mut result = BackendTickResult::default();

        for kernel in Kernel::PIPELINE {
            let pass_start = Instant::now();
            let stats = self.dispatch(kernel, buffers, params, dt)?;
            let us = pass_start.elapsed().as_micros() as f64;
            if us > SLOW_PASS_US {
                warn!(
                    "[{}] Slow {} pass: {:.2}ms",
                    self.backend_name(),
                    kernel.name(),
                    us / 1000.0
                );
            }
            result.timing.record(kernel, us);
            result.stats.merge(stats);
        }

        let sync_start = Instant::now();
        let synced = self.synchronize(buffers)?;
        result.stats.merge(synced);
        result.timing.transfer_us = sync_start.elapsed().as_micros() as f64;
        result.timing.total_us = start.elapsed().as_micros() as f64;

        Ok(result)
    }
}

/// Backend type enum for construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendType {
    /// rayon data-parallel passes
    CPU,

    /// GPU via WGPU (Metal/Vulkan/DirectX - cross-platform)
    #[cfg(feature = "gpu")]
    WGPU,

    /// Auto-select based on workload size and hardware availability
    #[default]
    Auto,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::CPU => write!(f, "CPU"),
            #[cfg(feature = "gpu")]
            BackendType::WGPU => write!(f, "WGPU"),
            BackendType::Auto => write!(f, "Auto"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(BackendType::CPU),
            #[cfg(feature = "gpu")]
            "wgpu" | "gpu" => Ok(BackendType::WGPU),
            "auto" => Ok(BackendType::Auto),
            _ => Err(SimulationError::InvalidBackend(s.to_string())),
        }
    }
}

/// Thresholds for backend auto-selection
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Minimum agents to consider the GPU (default: 200,000)
    pub gpu_agent_threshold: usize,

    /// Minimum trail cells to consider the GPU (default: 4,000,000)
    pub gpu_cell_threshold: usize,

    /// Force CPU even if GPU would be beneficial
    pub force_cpu: bool,

    /// Force GPU even if CPU would be better (for testing)
    pub force_gpu: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            // Below this the per-tick read-back dominates
            gpu_agent_threshold: 200_000,
            gpu_cell_threshold: 4_000_000,
            force_cpu: false,
            force_gpu: false,
        }
    }
}

impl BackendConfig {
    /// Auto-selection config honoring an explicit backend request
    pub fn for_request(requested: BackendType) -> Self {
        match requested {
            BackendType::CPU => Self {
                force_cpu: true,
                ..Default::default()
            },
            #[cfg(feature = "gpu")]
            BackendType::WGPU => Self {
                force_gpu: true,
                ..Default::default()
            },
            BackendType::Auto => Self::default(),
        }
    }
}

/// Backend selection decision with rationale
#[derive(Debug, Clone)]
pub struct BackendDecision {
    pub backend_type: BackendType,
    pub reason: String,
}

/// Auto-select a backend based on workload size and hardware
///
/// Selection priority:
/// 1. Honor force flags (force_cpu, force_gpu)
/// 2. Try WGPU (if compiled in, available and the workload is large enough)
/// 3. Fall back to CPU - always available
pub fn select_backend(agent_count: usize, cell_count: usize, config: &BackendConfig) -> BackendDecision {
    if config.force_cpu {
        return BackendDecision {
            backend_type: BackendType::CPU,
            reason: "Forced CPU via configuration".to_string(),
        };
    }

    #[cfg(feature = "gpu")]
    if config.force_gpu {
        if is_gpu_available() {
            return BackendDecision {
                backend_type: BackendType::WGPU,
                reason: "Forced WGPU via configuration".to_string(),
            };
        }
        warn!("[BACKEND] WGPU forced but not available, falling back to CPU");
        return BackendDecision {
            backend_type: BackendType::CPU,
            reason: "WGPU forced but not available, falling back to CPU".to_string(),
        };
    }

    let _meets_gpu_threshold =
        agent_count >= config.gpu_agent_threshold || cell_count >= config.gpu_cell_threshold;

    #[cfg(feature = "gpu")]
    if _meets_gpu_threshold && is_gpu_available() {
        return BackendDecision {
            backend_type: BackendType::WGPU,
            reason: format!(
                "WGPU selected: {} agents, {} cells (cross-platform GPU)",
                agent_count, cell_count
            ),
        };
    }

    BackendDecision {
        backend_type: BackendType::CPU,
        reason: format!(
            "CPU selected: {} agents, {} cells (below GPU thresholds or GPU not available)",
            agent_count, cell_count
        ),
    }
}

/// Check if GPU is available
#[cfg(feature = "gpu")]
fn is_gpu_available() -> bool {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .is_some()
}

/// Build the backend for a resolved (non-Auto) type.
pub fn create_backend(
    backend_type: BackendType,
    agent_count: usize,
    cell_count: usize,
    threads: usize,
) -> Result<Box<dyn ComputeBackend>> {
    let resolved = if backend_type == BackendType::Auto {
        let decision = select_backend(agent_count, cell_count, &BackendConfig::default());
        tracing::info!(
            "[BACKEND] Auto-selection: {} ({})",
            decision.backend_type,
            decision.reason
        );
        decision.backend_type
    } else {
        backend_type
    };

    match resolved {
        BackendType::CPU => Ok(Box::new(CpuBackend::with_threads(threads)?)),
        #[cfg(feature = "gpu")]
        BackendType::WGPU => Ok(Box::new(WgpuBackend::new(agent_count, cell_count)?)),
        BackendType::Auto => Err(SimulationError::InvalidBackend(
            "Auto must be resolved before construction".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_parse_and_display() {
        assert_eq!("cpu".parse::<BackendType>().unwrap(), BackendType::CPU);
        assert_eq!("AUTO".parse::<BackendType>().unwrap(), BackendType::Auto);
        assert!(matches!(
            "tpu".parse::<BackendType>(),
            Err(SimulationError::InvalidBackend(_))
        ));
        assert_eq!(BackendType::CPU.to_string(), "CPU");
    }

    #[test]
    fn test_small_workload_selects_cpu() {
        let decision = select_backend(1_000, 10_000, &BackendConfig::default());
        assert_eq!(decision.backend_type, BackendType::CPU);
    }

    #[test]
    fn test_force_cpu() {
        let config = BackendConfig::for_request(BackendType::CPU);
        let decision = select_backend(10_000_000, 10_000_000, &config);
        assert_eq!(decision.backend_type, BackendType::CPU);
        assert!(decision.reason.contains("Forced"));
    }

    #[test]
    fn test_pipeline_order() {
        assert_eq!(
            Kernel::PIPELINE.map(Kernel::name),
            ["agent_update", "commit_deposits", "decay_diffuse", "render"]
        );
    }
}
