// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Physarum Configuration System
//!
//! Type-safe configuration loader for the Physarum simulation with support for:
//! - TOML file parsing (`physarum_configuration.toml`)
//! - Environment variable overrides (`PHYSARUM_*`)
//! - CLI argument overrides
//!
//! ## Usage
//!
//! ```rust,no_run
//! use physarum_config::{load_config, validate_config};
//!
//! let config = load_config(None, None).expect("Failed to load config");
//! validate_config(&config).expect("Invalid config");
//!
//! println!("Agents: {}", config.simulation.num_agents);
//! println!("Field: {}x{}", config.simulation.width, config.simulation.height);
//! ```
//!
//! Every section is `#[serde(default)]`, so an empty file is a valid
//! configuration.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config,
    CONFIG_FILE_NAME, CONFIG_PATH_ENV,
};
pub use types::*;
pub use validation::{validate_config, ConfigValidationError};

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found. Searched: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PhysarumConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: PhysarumConfig = toml::from_str("").unwrap();
        assert_eq!(config.simulation.num_agents, SimulationConfig::default().num_agents);
        assert_eq!(config.agents.boundary, "bounce");
    }

    #[test]
    fn test_parse_error_is_mapped() {
        let err: ConfigError = toml::from_str::<PhysarumConfig>("[simulation\nwidth = 3")
            .unwrap_err()
            .into();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
