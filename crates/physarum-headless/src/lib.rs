// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Physarum Headless Runner
//!
//! Runs a simulation described by `physarum_configuration.toml` without a
//! window, writing frames as a PNG sequence. Used for offline renders,
//! benchmarking on servers, and end-to-end tests.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod png_surface;
pub mod runner;
pub mod settings;

pub use png_surface::PngSequenceSurface;
pub use runner::{run, RunOptions, RunSummary};
pub use settings::{logging_options, simulation_clock, simulation_settings};
