// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for simulation operations

/// Error types for simulation operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    /// Rejected at creation time, before any state is allocated
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Rejected live parameter update; the previous value stays in effect
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Invalid backend: {0}")]
    InvalidBackend(String),

    /// Compute backend failed to bind or dispatch. Not retried.
    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("Presentation surface error: {0}")]
    SurfaceError(String),
}

pub type Result<T> = core::result::Result<T, SimulationError>;
