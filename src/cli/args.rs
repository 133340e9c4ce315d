//! Argument processing and validation for CLI commands
//!
//! Checks that clap cannot express on its own run here, before a command
//! reaches its handler.

use super::{Commands, ConfigAction, LogAction};
use anyhow::Result;
use notification_forwarder::config::CONFIG_KEYS;

/// Parse a `NAME=VALUE` header argument.
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("header name cannot be empty".to_string());
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Handles argument validation
pub struct ArgProcessor;

impl ArgProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_command(&self, command: &Commands) -> Result<()> {
        match command {
            Commands::Config { action } => self.validate_config_action(action),
            Commands::Log {
                action: LogAction::List { limit, .. },
            } => {
                if *limit == 0 {
                    return Err(anyhow::anyhow!("--limit must be at least 1"));
                }
                Ok(())
            }
            Commands::Destination { .. }
            | Commands::Rule { .. }
            | Commands::Log { .. }
            | Commands::Init { .. }
            | Commands::Ingest
            | Commands::Preview { .. } => Ok(()),
        }
    }

    fn validate_config_action(&self, action: &ConfigAction) -> Result<()> {
        match action {
            ConfigAction::Set { key, .. } | ConfigAction::Get { key } => self.validate_config_key(key),
            ConfigAction::Show => Ok(()),
        }
    }

    fn validate_config_key(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(anyhow::anyhow!("Configuration key cannot be empty"));
        }
        if !CONFIG_KEYS.contains(&key) {
            return Err(anyhow::anyhow!(
                "Unknown configuration key: {}. Valid keys are: {}",
                key,
                CONFIG_KEYS.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ArgProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Authorization=Bearer a=b").unwrap(),
            ("Authorization".to_string(), "Bearer a=b".to_string())
        );
        assert!(parse_header("NoEquals").is_err());
        assert!(parse_header("=value").is_err());
    }

    #[test]
    fn test_validate_config_key() {
        let processor = ArgProcessor::new();
        assert!(processor.validate_config_key("dispatcher.max_attempts").is_ok());
        assert!(processor.validate_config_key("logging.level").is_ok());
        assert!(processor.validate_config_key("server.url").is_err());
        assert!(processor.validate_config_key("").is_err());
    }

    #[test]
    fn test_validate_log_limit() {
        let processor = ArgProcessor::new();
        let zero = Commands::Log {
            action: LogAction::List {
                success: false,
                failed: false,
                package: None,
                limit: 0,
            },
        };
        assert!(processor.validate_command(&zero).is_err());
        assert!(processor.validate_command(&Commands::Ingest).is_ok());
    }
}
