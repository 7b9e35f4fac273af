// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use physarum_config::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config, validate_config, ConfigError,
    PhysarumConfig,
};
use physarum_headless::{logging_options, run, RunOptions};
use physarum_observability::{init_logging, parse_debug_flags};
use tracing::{info, warn};

/// Physarum headless runner - simulates without a window and writes PNG frames
#[derive(Parser, Debug)]
#[command(name = "physarum-headless", version, author, long_about = None)]
struct Args {
    /// Configuration file (default: search for physarum_configuration.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override a configuration value, e.g. --set trail.decay_rate=0.9 (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Stop after this many ticks (0 = until Ctrl+C)
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Directory for PNG frames
    #[arg(long)]
    frame_dir: Option<PathBuf>,

    /// Do not write frames
    #[arg(long, default_value_t = false)]
    no_frames: bool,

    /// Pace ticks at simulation.tick_rate_hz instead of running flat out
    #[arg(long, default_value_t = false)]
    realtime: bool,

    /// Also write the final summary JSON to this file
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Enable debug logging for crates (comma-separated, or "all")
    #[arg(long, value_delimiter = ',')]
    debug: Vec<String>,
}

fn parse_overrides(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut overrides = HashMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Override '{}' is not of the form KEY=VALUE", pair);
        };
        overrides.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(overrides)
}

/// Returns the configuration and whether a file was found
fn load(args: &Args) -> Result<(PhysarumConfig, Option<PathBuf>)> {
    let overrides = parse_overrides(&args.overrides)?;

    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => match find_config_file() {
            Ok(path) => Some(path),
            Err(ConfigError::FileNotFound(_)) => None,
            Err(e) => return Err(e.into()),
        },
    };

    let mut config = match &path {
        Some(path) => load_config(Some(path), Some(&overrides))
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => {
            let mut config = PhysarumConfig::default();
            apply_environment_overrides(&mut config)?;
            apply_cli_overrides(&mut config, &overrides)?;
            config
        }
    };

    // Dedicated flags win over --set
    if let Some(ticks) = args.ticks {
        config.output.max_ticks = ticks;
    }
    if let Some(frame_dir) = &args.frame_dir {
        config.output.frame_dir = frame_dir.clone();
    }
    if args.no_frames {
        config.output.frame_interval = 0;
    }

    validate_config(&config)?;
    Ok((config, path))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let (config, config_path) = load(&args)?;

    let mut debug_flags = parse_debug_flags();
    for crate_name in &args.debug {
        debug_flags.merge_env_value(crate_name);
    }
    let _logging = init_logging(&debug_flags, &logging_options(&config))?;

    info!("Physarum headless v{}", physarum_headless::VERSION);
    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => warn!("No configuration file found, using defaults"),
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Shutdown signal received...");
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl+C handler")?;

    if config.output.max_ticks == 0 {
        info!("Running until interrupted (Press Ctrl+C to stop)...");
    }

    let summary = run(&config, RunOptions { realtime: args.realtime }, running)?;

    let json = serde_json::to_string_pretty(&summary)?;
    println!("{}", json);
    if let Some(path) = &args.summary {
        std::fs::write(path, &json).with_context(|| format!("Failed to write {}", path.display()))?;
    }

    info!("Shutdown complete");
    Ok(())
}
