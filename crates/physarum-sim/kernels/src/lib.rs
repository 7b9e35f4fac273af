// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Physarum Simulation Kernels (Platform-Agnostic)
//!
//! ALL per-element simulation math in one place:
//! - **Types**: vectors, colors, domain bounds, errors
//! - **Trail**: the scalar trail field (deposit, sample, decay + diffuse stencil)
//! - **Agent**: the sense → turn → move → deposit rule for a single agent
//! - **Raster**: trail shading and agent disk coverage
//!
//! Nothing here knows about scheduling. Compute backends in `physarum-sim-engine`
//! decide how these kernels are dispatched (rayon, WGPU) and in which order.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod agent;
pub mod raster;
pub mod trail;
pub mod types;

pub use agent::*;
pub use raster::{disk_pixels, shade_trail, RenderParams};
pub use trail::{EdgeTopology, TrailField};
pub use types::{BoundaryPolicy, DomainBounds, Result, Rgba, SimulationError, Vec2};
