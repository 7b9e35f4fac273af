// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Physarum - agent/trail simulation for generative visualization
//!
//! A population of agents moves across a 2D grid. Each agent samples a scalar
//! trail field at three points ahead of it, steers toward the strongest
//! signal, moves, and deposits into the field. The field then decays and
//! blurs, and a frame is rendered from field plus agents. Emergent network
//! structures ("slime mold" patterns) appear from these local rules alone.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! physarum = "0.1"  # Default: config + observability
//! ```
//!
//! ```rust,no_run
//! use physarum::prelude::*;
//!
//! let mut sim = Simulation::new(SimulationSettings {
//!     num_agents: 50_000,
//!     width: 512,
//!     height: 512,
//!     ..Default::default()
//! })?;
//!
//! for _ in 0..600 {
//!     sim.tick(1.0 / 60.0)?;
//! }
//! let frame = sim.frame(); // RGBA8, width x height
//! # let _ = frame;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Feature Flags
//!
//! - **`config`** (default): TOML configuration loader (`physarum::config`)
//! - **`observability`** (default): logging setup (`physarum::observability`)
//! - **`gpu`**: WGPU compute backend
//! - **`file-logging`**: per-run JSON log files
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Kernels: physarum-sim-kernels                          │
//! │  (Vec2, Agent, TrailField, step rule, rasterizer)       │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Engine: physarum-sim-engine                            │
//! │  (CPU/WGPU backends, Simulation, clock, tick loop)      │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Applications: physarum-headless                        │
//! │  (config -> simulation -> PNG frames)                   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

pub use physarum_sim_engine as engine;
pub use physarum_sim_kernels as kernels;

#[cfg(feature = "config")]
pub use physarum_config as config;

#[cfg(feature = "observability")]
pub use physarum_observability as observability;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::kernels::{
        Agent, AgentParams, BoundaryPolicy, DomainBounds, EdgeTopology, RenderParams, Rgba, SimulationError,
        TrailField, Vec2,
    };

    pub use crate::engine::{
        BackendType, ComputeBackend, DiagnosticsChannel, LatestFrameSurface, ParameterUpdate, ParameterUpdateQueue,
        PresentationSurface, Simulation, SimulationClock, SimulationParams, SimulationSettings, SimulationStats,
        TickLoopRunner, TickReport,
    };

    #[cfg(feature = "config")]
    pub use crate::config::{load_config, validate_config, PhysarumConfig};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_facade_imports() {
        use crate::prelude::*;
        let settings = SimulationSettings::default();
        assert_eq!(settings.params.agent.boundary, BoundaryPolicy::Bounce);
        assert!(!crate::engine::VERSION.is_empty());
    }
}
