//! Configuration management handler
//!
//! Handles `init` and the `config show|get|set` commands.

use super::super::{CliContext, ConfigAction};
use anyhow::Result;
use notification_forwarder::config::ConfigManager;

pub struct ConfigHandler<'a> {
    context: &'a CliContext,
}

impl<'a> ConfigHandler<'a> {
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    pub fn handle_init(&self, force: bool) -> Result<()> {
        let manager = &self.context.config_manager;
        let config_path = manager.config_path();

        if manager.was_created() {
            println!("Configuration initialized successfully at: {}", config_path.display());
            return Ok(());
        }

        if !force {
            println!("Configuration already initialized at: {}", config_path.display());
            println!("Use --force to overwrite");
            return Ok(());
        }

        let mut config_manager = ConfigManager::new(self.context.config_dir.clone())?;
        config_manager.reset();
        config_manager.save()?;
        println!("Configuration reset to defaults at: {}", config_path.display());
        Ok(())
    }

    pub fn handle_config(&self, action: ConfigAction) -> Result<()> {
        let mut config_manager = ConfigManager::new(self.context.config_dir.clone())?;

        match action {
            ConfigAction::Show => {
                println!("{}", toml::to_string_pretty(config_manager.config())?);
            }
            ConfigAction::Get { key } => {
                println!("{}", config_manager.get(&key)?);
            }
            ConfigAction::Set { key, value } => {
                config_manager.set(&key, &value)?;
                config_manager.save()?;
                println!("Configuration updated: {key} = {value}");
            }
        }

        Ok(())
    }
}
