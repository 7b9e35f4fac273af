// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later tiers win:
//! 1. TOML file (base values)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, PhysarumConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "physarum_configuration.toml";

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "PHYSARUM_CONFIG_PATH";

/// Find the configuration file
///
/// Search order:
/// 1. `PHYSARUM_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load configuration from a TOML file and apply overrides
///
/// * `config_path` - Optional path to config file. If `None`, the file is searched for.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns an error if the file is missing, is not valid TOML, or an override
/// value cannot be parsed. Range checks are left to [`crate::validate_config`].
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<PhysarumConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: PhysarumConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config)?;
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    Ok(config)
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(format!("{} = '{}'", key, value)))
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(format!("{} = '{}'", key, value))),
    }
}

/// Apply a single `key = value` override. Keys use the `section.field` form
/// (`trail.decay_rate`); the bare field name is accepted when unambiguous.
fn apply_override(config: &mut PhysarumConfig, key: &str, value: &str) -> ConfigResult<bool> {
    match key {
        "simulation.num_agents" | "num_agents" => config.simulation.num_agents = parse_value(key, value)?,
        "simulation.width" | "width" => config.simulation.width = parse_value(key, value)?,
        "simulation.height" | "height" => config.simulation.height = parse_value(key, value)?,
        "simulation.seed" | "seed" => config.simulation.seed = parse_value(key, value)?,
        "simulation.fixed_delta_time" | "fixed_delta_time" => {
            config.simulation.fixed_delta_time = parse_value(key, value)?
        }
        "simulation.tick_rate_hz" | "tick_rate_hz" => config.simulation.tick_rate_hz = parse_value(key, value)?,

        "agents.min_velocity" | "min_velocity" => config.agents.min_velocity = parse_value(key, value)?,
        "agents.max_velocity" | "max_velocity" => config.agents.max_velocity = parse_value(key, value)?,
        "agents.fov_degrees" | "fov_degrees" | "agent_fov" => config.agents.fov_degrees = parse_value(key, value)?,
        "agents.turn_ratio" | "turn_ratio" | "agent_turn_ratio" => {
            config.agents.turn_ratio = parse_value(key, value)?
        }
        "agents.sensor_distance" | "sensor_distance" => config.agents.sensor_distance = parse_value(key, value)?,
        "agents.deposit_amount" | "deposit_amount" => config.agents.deposit_amount = parse_value(key, value)?,
        "agents.boundary" | "boundary" => config.agents.boundary = value.trim().to_lowercase(),

        "trail.decay_rate" | "decay_rate" => config.trail.decay_rate = parse_value(key, value)?,
        "trail.blur_ratio" | "blur_ratio" => config.trail.blur_ratio = parse_value(key, value)?,
        "trail.blur_radius" | "blur_radius" => config.trail.blur_radius = parse_value(key, value)?,
        "trail.wrap_edges" | "wrap_edges" => config.trail.wrap_edges = parse_bool(key, value)?,

        "render.agent_radius" | "agent_radius" => config.render.agent_radius = parse_value(key, value)?,

        "diagnostics.enabled" | "diagnostics" => config.diagnostics.enabled = parse_bool(key, value)?,
        "diagnostics.agent_limit" => config.diagnostics.agent_limit = parse_value(key, value)?,

        "compute.backend" | "backend" => config.compute.backend = value.trim().to_lowercase(),
        "compute.threads" | "threads" => config.compute.threads = parse_value(key, value)?,

        "output.frame_dir" | "frame_dir" => config.output.frame_dir = PathBuf::from(value),
        "output.frame_interval" | "frame_interval" => config.output.frame_interval = parse_value(key, value)?,
        "output.max_ticks" | "max_ticks" => config.output.max_ticks = parse_value(key, value)?,

        "logging.level" | "log_level" => config.logging.level = value.trim().to_string(),
        "logging.log_dir" | "log_dir" => config.logging.log_dir = PathBuf::from(value),
        "logging.file_logging" | "file_logging" => config.logging.file_logging = parse_bool(key, value)?,

        _ => return Ok(false),
    }
    Ok(true)
}

/// Environment variables and the keys they override
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("PHYSARUM_NUM_AGENTS", "simulation.num_agents"),
    ("PHYSARUM_WIDTH", "simulation.width"),
    ("PHYSARUM_HEIGHT", "simulation.height"),
    ("PHYSARUM_SEED", "simulation.seed"),
    ("PHYSARUM_TICK_RATE_HZ", "simulation.tick_rate_hz"),
    ("PHYSARUM_DECAY_RATE", "trail.decay_rate"),
    ("PHYSARUM_BLUR_RATIO", "trail.blur_ratio"),
    ("PHYSARUM_BOUNDARY", "agents.boundary"),
    ("PHYSARUM_BACKEND", "compute.backend"),
    ("PHYSARUM_THREADS", "compute.threads"),
    ("PHYSARUM_LOG_LEVEL", "logging.level"),
    ("PHYSARUM_FRAME_DIR", "output.frame_dir"),
];

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `PHYSARUM_NUM_AGENTS` -> `simulation.num_agents`
/// - `PHYSARUM_WIDTH` / `PHYSARUM_HEIGHT` -> `simulation.width` / `simulation.height`
/// - `PHYSARUM_SEED` -> `simulation.seed`
/// - `PHYSARUM_TICK_RATE_HZ` -> `simulation.tick_rate_hz`
/// - `PHYSARUM_DECAY_RATE` / `PHYSARUM_BLUR_RATIO` -> `trail.*`
/// - `PHYSARUM_BOUNDARY` -> `agents.boundary`
/// - `PHYSARUM_BACKEND` / `PHYSARUM_THREADS` -> `compute.*`
/// - `PHYSARUM_LOG_LEVEL` -> `logging.level`
/// - `PHYSARUM_FRAME_DIR` -> `output.frame_dir`
pub fn apply_environment_overrides(config: &mut PhysarumConfig) -> ConfigResult<()> {
    for (var, key) in ENV_OVERRIDES {
        if let Ok(value) = env::var(var) {
            apply_override(config, key, &value)?;
        }
    }
    Ok(())
}

/// Apply CLI argument overrides to configuration
///
/// Keys are `section.field` (e.g. `{"trail.decay_rate": "0.9"}`) or a bare
/// field name. Unknown keys are rejected.
pub fn apply_cli_overrides(config: &mut PhysarumConfig, cli_args: &HashMap<String, String>) -> ConfigResult<()> {
    // Sorted so an error always names the same key
    let mut keys: Vec<&String> = cli_args.keys().collect();
    keys.sort();
    for key in keys {
        let value = &cli_args[key];
        if !apply_override(config, key, value)? {
            return Err(ConfigError::InvalidValue(format!("unknown configuration key '{}'", key)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for (var, _) in ENV_OVERRIDES {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var(CONFIG_PATH_ENV, config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var(CONFIG_PATH_ENV);

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nope.toml");

        env::set_var(CONFIG_PATH_ENV, config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var(CONFIG_PATH_ENV);

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_env();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[simulation]").unwrap();
        writeln!(file, "num_agents = 250").unwrap();
        writeln!(file, "[agents]").unwrap();
        writeln!(file, "boundary = \"wrap\"").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.simulation.num_agents, 250);
        assert_eq!(config.agents.boundary, "wrap");
        assert_eq!(config.trail.decay_rate, 0.95);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = load_config(Some(&dir.path().join("absent.toml")), None);
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_env();
        let mut config = PhysarumConfig::default();

        env::set_var("PHYSARUM_NUM_AGENTS", "42");
        env::set_var("PHYSARUM_BACKEND", "AUTO");

        let result = apply_environment_overrides(&mut config);
        clear_env();

        result.unwrap();
        assert_eq!(config.simulation.num_agents, 42);
        assert_eq!(config.compute.backend, "auto");
    }

    #[test]
    fn test_environment_override_bad_number() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_env();
        let mut config = PhysarumConfig::default();

        env::set_var("PHYSARUM_DECAY_RATE", "lots");
        let result = apply_environment_overrides(&mut config);
        clear_env();

        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = PhysarumConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("trail.decay_rate".to_string(), "0.5".to_string());
        cli_args.insert("agent_fov".to_string(), "30".to_string());
        cli_args.insert("wrap_edges".to_string(), "yes".to_string());

        apply_cli_overrides(&mut config, &cli_args).unwrap();

        assert_eq!(config.trail.decay_rate, 0.5);
        assert_eq!(config.agents.fov_degrees, 30.0);
        assert!(config.trail.wrap_edges);
    }

    #[test]
    fn test_cli_unknown_key_rejected() {
        let mut config = PhysarumConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("warp_speed".to_string(), "9".to_string());

        assert!(matches!(
            apply_cli_overrides(&mut config, &cli_args),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_env();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[simulation]").unwrap();
        writeln!(file, "width = 100").unwrap();
        writeln!(file, "height = 100").unwrap();

        env::set_var("PHYSARUM_WIDTH", "200");
        env::set_var("PHYSARUM_HEIGHT", "200");

        let mut cli_args = HashMap::new();
        cli_args.insert("width".to_string(), "300".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args));
        clear_env();
        let config = config.unwrap();

        // CLI wins for width, env wins for height
        assert_eq!(config.simulation.width, 300);
        assert_eq!(config.simulation.height, 200);
    }
}
