//! Tracing subscriber setup.

use std::ffi::OsStr;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::errors::{AppError, AppResult, ErrorContextExt};

const DEFAULT_LOG_FILE: &str = "forwarder.log";

/// Install the global subscriber.
///
/// Console output goes to stderr so command output on stdout stays clean.
/// When `config.file` is set, a daily rolling file is written as well; keep
/// the returned guard alive until exit or buffered lines are lost.
pub fn init(config: &LoggingConfig, verbose: bool) -> AppResult<Option<WorkerGuard>> {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let env_filter = EnvFilter::from_default_env()
        .add_directive(level.parse().unwrap_or_else(|_| LevelFilter::INFO.into()));

    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let Some(log_path) = &config.file else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .try_init()
            .map_err(|e| AppError::config_with_source("Failed to initialize logging", e))?;
        return Ok(None);
    };

    let dir = log_path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).in_file_operation(dir, "create log directory")?;

    let file_appender = tracing_appender::rolling::daily(
        dir,
        log_path.file_name().unwrap_or_else(|| OsStr::new(DEFAULT_LOG_FILE)),
    );
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::config_with_source("Failed to initialize logging", e))?;

    tracing::debug!("Logging to {:?}", log_path);
    Ok(Some(guard))
}
