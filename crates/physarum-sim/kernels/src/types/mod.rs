// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Simulation Types Module
//!
//! Core type definitions shared by every kernel and backend.

pub mod bounds;
pub mod color;
pub mod error;
pub mod vector;

pub use bounds::{BoundaryPolicy, DomainBounds};
pub use color::Rgba;
pub use error::{Result, SimulationError};
pub use vector::Vec2;
