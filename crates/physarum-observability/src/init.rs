// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console output is always installed. With the `file-logging` feature and a
//! log directory, each run also gets its own folder of JSON log files:
//!
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       ├── physarum-sim-engine.log
//!       ├── physarum-headless.log
//!       └── physarum.log (combined)
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

const RUN_PREFIX: &str = "run_";
const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Logging setup beyond the debug flags
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Level for crates without a debug flag (trace, debug, info, warn, error)
    pub default_level: String,
    /// Base directory for per-run log folders; `None` logs to console only
    pub log_dir: Option<PathBuf>,
    /// Remove run folders older than this many days
    pub retention_days: u64,
    /// Keep at most this many run folders
    pub retention_runs: usize,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            log_dir: None,
            retention_days: 30,
            retention_runs: 10,
        }
    }
}

/// Keeps file writers alive; logs are flushed when this is dropped
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    fn console_only() -> Self {
        Self {
            #[cfg(feature = "file-logging")]
            _file_guards: Vec::new(),
            log_dir: None,
        }
    }

    /// This run's log folder, when file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

fn build_filter(debug_flags: &CrateDebugFlags, default_level: &str) -> Result<EnvFilter> {
    let directives = debug_flags.to_filter_string_with_default(default_level);
    EnvFilter::try_new(&directives).with_context(|| format!("Invalid log filter: {}", directives))
}

fn console_layer(filter: EnvFilter) -> Box<dyn Layer<Registry> + Send + Sync> {
    tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(filter)
        .boxed()
}

/// Install a console-only subscriber
///
/// # Errors
/// Fails if the level is not a valid filter directive or a global subscriber
/// is already installed.
pub fn init_console_logging(debug_flags: &CrateDebugFlags, default_level: &str) -> Result<LoggingGuard> {
    let filter = build_filter(debug_flags, default_level)?;
    Registry::default()
        .with(vec![console_layer(filter)])
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(LoggingGuard::console_only())
}

/// Install console logging and, when configured, per-run file logging
pub fn init_logging(debug_flags: &CrateDebugFlags, options: &LoggingOptions) -> Result<LoggingGuard> {
    match &options.log_dir {
        None => init_console_logging(debug_flags, &options.default_level),
        #[cfg(feature = "file-logging")]
        Some(base_log_dir) => init_file_logging(debug_flags, options, base_log_dir),
        #[cfg(not(feature = "file-logging"))]
        Some(base_log_dir) => {
            let guard = init_console_logging(debug_flags, &options.default_level)?;
            tracing::warn!(
                "[LOGGING] Log directory {} ignored: built without the file-logging feature",
                base_log_dir.display()
            );
            Ok(guard)
        }
    }
}

/// Combined log in each run folder, next to one `<crate>.log` per known crate
pub const COMBINED_LOG_FILE: &str = "physarum.log";

/// File names opened in a run folder, per-crate files first. Every name gets one writer.
#[cfg(any(feature = "file-logging", test))]
fn run_log_files() -> Vec<String> {
    crate::KNOWN_CRATES
        .iter()
        .map(|crate_name| format!("{}.log", crate_name))
        .chain(std::iter::once(COMBINED_LOG_FILE.to_string()))
        .collect()
}

#[cfg(feature = "file-logging")]
fn init_file_logging(
    debug_flags: &CrateDebugFlags,
    options: &LoggingOptions,
    base_log_dir: &Path,
) -> Result<LoggingGuard> {
    use tracing_appender::rolling;

    let timestamp = Utc::now().format(RUN_TIMESTAMP_FORMAT);
    let run_folder = base_log_dir.join(format!("{}{}", RUN_PREFIX, timestamp));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

    cleanup_old_logs(base_log_dir, options.retention_days, options.retention_runs, Utc::now())?;

    let mut layers = vec![console_layer(build_filter(debug_flags, &options.default_level)?)];
    let mut file_guards = Vec::new();

    let file_names = run_log_files();
    let (crate_files, _) = file_names.split_at(crate::KNOWN_CRATES.len());

    // One file per crate at debug level
    for (crate_name, file_name) in crate::KNOWN_CRATES.iter().zip(crate_files) {
        let appender = rolling::never(&run_folder, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        file_guards.push(guard);

        let crate_filter = EnvFilter::try_new(format!("{}=debug", crate_name.replace('-', "_")))
            .with_context(|| format!("Invalid log filter for {}", crate_name))?;
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .with_filter(crate_filter)
                .boxed(),
        );
    }

    let combined = rolling::never(&run_folder, COMBINED_LOG_FILE);
    let (combined_writer, combined_guard) = tracing_appender::non_blocking(combined);
    file_guards.push(combined_guard);
    layers.push(
        tracing_subscriber::fmt::layer()
            .with_writer(combined_writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .with_filter(build_filter(debug_flags, &options.default_level)?)
            .boxed(),
    );

    Registry::default()
        .with(layers)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LoggingGuard {
        _file_guards: file_guards,
        log_dir: Some(run_folder),
    })
}

fn run_timestamp(dir_name: &str) -> Option<DateTime<Utc>> {
    let stamp = dir_name.strip_prefix(RUN_PREFIX)?;
    let naive = NaiveDateTime::parse_from_str(stamp, RUN_TIMESTAMP_FORMAT).ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

/// Remove run folders older than `retention_days`, then the oldest beyond
/// `retention_runs`. Returns the number removed.
///
/// Directories not named `run_<timestamp>` are never touched.
pub fn cleanup_old_logs(
    base_log_dir: &Path,
    retention_days: u64,
    retention_runs: usize,
    now: DateTime<Utc>,
) -> Result<usize> {
    if !base_log_dir.exists() {
        return Ok(0);
    }

    let cutoff = now - chrono::Duration::days(retention_days as i64);
    let mut runs: Vec<(PathBuf, DateTime<Utc>)> = Vec::new();

    for entry in std::fs::read_dir(base_log_dir)
        .with_context(|| format!("Failed to read log directory: {}", base_log_dir.display()))?
    {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(dt) = path.file_name().and_then(|n| n.to_str()).and_then(run_timestamp) {
            runs.push((path, dt));
        }
    }

    // Oldest first
    runs.sort_by_key(|(_, dt)| *dt);
    let excess = runs.len().saturating_sub(retention_runs);

    let mut removed = 0;
    for (i, (path, dt)) in runs.iter().enumerate() {
        if *dt >= cutoff && i >= excess {
            continue;
        }
        match std::fs::remove_dir_all(path) {
            Ok(()) => removed += 1,
            // The subscriber may not be installed yet
            Err(e) => eprintln!("Warning: Failed to remove old log directory {}: {}", path.display(), e),
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_run(base: &Path, when: DateTime<Utc>) -> PathBuf {
        let dir = base.join(format!("{}{}", RUN_PREFIX, when.format(RUN_TIMESTAMP_FORMAT)));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_run_timestamp_parsing() {
        let dt = run_timestamp("run_20250101_120000").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2025-01-01 12:00:00");
        assert!(run_timestamp("run_garbage").is_none());
        assert!(run_timestamp("frames").is_none());
    }

    #[test]
    fn test_cleanup_by_age() {
        let dir = tempdir().unwrap();
        let now = Utc::now();
        let old = make_run(dir.path(), now - chrono::Duration::days(40));
        let recent = make_run(dir.path(), now - chrono::Duration::days(1));

        let removed = cleanup_old_logs(dir.path(), 30, 10, now).unwrap();

        assert_eq!(removed, 1);
        assert!(!old.exists());
        assert!(recent.exists());
    }

    #[test]
    fn test_cleanup_by_count_keeps_newest() {
        let dir = tempdir().unwrap();
        let now = Utc::now();
        let runs: Vec<PathBuf> = (1..=4)
            .map(|h| make_run(dir.path(), now - chrono::Duration::hours(h)))
            .collect();

        let removed = cleanup_old_logs(dir.path(), 30, 2, now).unwrap();

        assert_eq!(removed, 2);
        // runs[0] is the newest
        assert!(runs[0].exists());
        assert!(runs[1].exists());
        assert!(!runs[2].exists());
        assert!(!runs[3].exists());
    }

    #[test]
    fn test_cleanup_ignores_foreign_dirs() {
        let dir = tempdir().unwrap();
        let foreign = dir.path().join("keep_me");
        std::fs::create_dir_all(&foreign).unwrap();

        assert_eq!(cleanup_old_logs(dir.path(), 0, 0, Utc::now()).unwrap(), 0);
        assert!(foreign.exists());
    }

    #[test]
    fn test_missing_dir_is_noop() {
        let dir = tempdir().unwrap();
        assert_eq!(cleanup_old_logs(&dir.path().join("absent"), 30, 10, Utc::now()).unwrap(), 0);
    }

    #[test]
    fn test_one_writer_per_run_file() {
        let files = run_log_files();
        assert_eq!(files.len(), crate::KNOWN_CRATES.len() + 1);
        assert_eq!(files.last().map(String::as_str), Some(COMBINED_LOG_FILE));

        let unique: std::collections::BTreeSet<&String> = files.iter().collect();
        assert_eq!(unique.len(), files.len());
    }

    #[test]
    fn test_crate_filters_do_not_overlap() {
        // A `name=debug` directive matches every target starting with `name`
        let targets: Vec<String> = crate::KNOWN_CRATES.iter().map(|c| c.replace('-', "_")).collect();
        for a in &targets {
            for b in &targets {
                if a != b {
                    assert!(!b.starts_with(a.as_str()), "{} shadows {}", a, b);
                }
            }
        }
    }

    #[test]
    fn test_invalid_level_rejected() {
        let flags = CrateDebugFlags::default();
        assert!(build_filter(&flags, "info").is_ok());
        assert!(build_filter(&flags, "physarum=notalevel").is_err());
    }
}
