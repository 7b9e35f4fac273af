// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end: TOML file -> simulation -> PNG frames on disk

use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use physarum_config::{load_config, validate_config};
use physarum_headless::{run, RunOptions};
use tempfile::tempdir;

#[test]
fn zero_agents_write_background_frames() {
    let dir = tempdir().unwrap();
    let frames = dir.path().join("frames");
    let config_path = dir.path().join("physarum_configuration.toml");
    fs::write(
        &config_path,
        format!(
            r#"
[simulation]
num_agents = 0
width = 8
height = 6

[render]
background_color = [0.0, 0.0, 1.0, 1.0]

[output]
frame_dir = "{}"
frame_interval = 2
max_ticks = 4
"#,
            frames.display().to_string().replace('\\', "/")
        ),
    )
    .unwrap();

    let config = load_config(Some(&config_path), None).unwrap();
    validate_config(&config).unwrap();

    let summary = run(&config, RunOptions::default(), Arc::new(AtomicBool::new(true))).unwrap();
    assert_eq!(summary.ticks, 4);
    assert_eq!(summary.frames_written, 2);
    assert_eq!(summary.stats.total_agents_rejected, 0);

    let frame = image::open(frames.join("frame_000004.png")).unwrap().to_rgba8();
    assert_eq!(frame.dimensions(), (8, 6));
    assert!(frame.pixels().all(|p| p.0 == [0, 0, 255, 255]));
}

#[test]
fn summary_serializes_to_json() {
    let dir = tempdir().unwrap();
    let mut config = physarum_config::PhysarumConfig::default();
    config.simulation.num_agents = 10;
    config.simulation.width = 16;
    config.simulation.height = 16;
    config.output.frame_interval = 0;
    config.output.frame_dir = dir.path().join("unused");
    config.output.max_ticks = 2;

    let summary = run(&config, RunOptions::default(), Arc::new(AtomicBool::new(true))).unwrap();
    let json: serde_json::Value = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["ticks"], 2);
    assert_eq!(json["stats"]["total_ticks"], 2);
    assert_eq!(json["interrupted"], false);
}
