// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # physarum-observability
//!
//! Logging infrastructure shared by the Physarum crates, with per-crate debug
//! flag support.
//!
//! ## Features
//! - `file-logging`: per-run JSON log files with retention cleanup (desktop only)

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known Physarum crate names for debug flags
///
/// The umbrella `physarum` crate only re-exports and never logs. Listing it would also make
/// its `physarum=debug` directive match every `physarum_*` target.
pub const KNOWN_CRATES: &[&str] = &[
    "physarum-sim-kernels",
    "physarum-sim-engine",
    "physarum-config",
    "physarum-observability",
    "physarum-headless",
];
