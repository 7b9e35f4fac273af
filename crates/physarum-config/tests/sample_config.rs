// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The sample configuration shipped at the workspace root must stay loadable
//! and equal to the built-in defaults.

use physarum_config::{validate_config, PhysarumConfig, CONFIG_FILE_NAME};
use std::path::PathBuf;

fn sample_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .join(CONFIG_FILE_NAME)
}

#[test]
fn sample_config_parses_and_validates() {
    let content = std::fs::read_to_string(sample_path()).unwrap();
    let config: PhysarumConfig = toml::from_str(&content).unwrap();
    validate_config(&config).unwrap();
}

#[test]
fn sample_config_matches_defaults() {
    let content = std::fs::read_to_string(sample_path()).unwrap();
    let config: PhysarumConfig = toml::from_str(&content).unwrap();
    assert_eq!(config, PhysarumConfig::default());
}
