//! CLI context for dependency injection and shared state
//!
//! Loads the configuration once and builds the [`ForwarderApp`] handlers work
//! against.

use anyhow::{Context, Result};
use notification_forwarder::app::ForwarderApp;
use notification_forwarder::config::ConfigManager;
use notification_forwarder::logging;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

/// CLI execution context containing shared dependencies and configuration
#[derive(Clone)]
pub struct CliContext {
    pub config_dir: Option<PathBuf>,
    pub verbose: bool,
    pub config_manager: Arc<ConfigManager>,
}

impl CliContext {
    pub fn new(config_dir: Option<PathBuf>, verbose: bool) -> Result<Self> {
        let config_manager = Arc::new(ConfigManager::new(config_dir.clone())?);
        Ok(Self {
            config_dir,
            verbose,
            config_manager,
        })
    }

    /// Initialize logging from the `[logging]` section; `--verbose` forces debug.
    pub fn init_logging(&self) -> Result<Option<WorkerGuard>> {
        let guard = logging::init(&self.config_manager.config().logging, self.verbose)?;

        if self.verbose {
            tracing::debug!("Verbose logging enabled");
            tracing::debug!("Config path: {:?}", self.config_manager.config_path());
        }

        Ok(guard)
    }

    /// Build the forwarder from the loaded configuration.
    pub fn app(&self) -> Result<ForwarderApp> {
        ForwarderApp::build(self.config_manager.config(), &self.config_manager.data_dir())
            .context("Failed to initialize forwarder")
    }
}
