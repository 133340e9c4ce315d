//! Configuration file management
//!
//! The configuration lives in a single TOML file, `config.toml`, inside the
//! configuration directory (`~/.notification-forwarder` unless overridden).
//! A file with default values is written on first use.

use directories::BaseDirs;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::{AppError, AppResult};

pub mod types;

pub use types::{Config, DeviceConfig, DispatcherConfig, LoggingConfig, RetentionConfig, StorageConfig};

const CONFIG_DIR_NAME: &str = ".notification-forwarder";
const CONFIG_FILE_NAME: &str = "config.toml";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Keys accepted by [`ConfigManager::get`] and [`ConfigManager::set`].
pub const CONFIG_KEYS: &[&str] = &[
    "dispatcher.max_attempts",
    "dispatcher.retry_base_delay_ms",
    "dispatcher.retry_jitter_factor",
    "dispatcher.request_timeout_secs",
    "dispatcher.response_excerpt_chars",
    "dispatcher.user_agent",
    "retention.max_records",
    "device.android_version",
    "device.device_model",
    "device.device_manufacturer",
    "storage.data_dir",
    "storage.persist",
    "logging.level",
    "logging.file",
];

/// Loads, edits and saves `config.toml`.
///
/// ```rust,no_run
/// use notification_forwarder::config::ConfigManager;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut manager = ConfigManager::new(None)?;
///     manager.set("dispatcher.max_attempts", "5")?;
///     manager.save()?;
///     Ok(())
/// }
/// ```
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
    created: bool,
}

impl ConfigManager {
    /// Load the configuration from `config_dir`, or the default directory when `None`.
    ///
    /// The directory and a default file are created if missing.
    pub fn new(config_dir: Option<PathBuf>) -> AppResult<Self> {
        let config_path = Self::get_config_path(config_dir)?;
        let (config, created) = Self::load_or_create(&config_path)?;
        Ok(Self {
            config_path,
            config,
            created,
        })
    }

    pub fn get_config_path(config_dir: Option<PathBuf>) -> AppResult<PathBuf> {
        let base_path = match config_dir {
            Some(dir) => dir,
            None => {
                let base_dirs =
                    BaseDirs::new().ok_or_else(|| AppError::config("Failed to get base directories"))?;
                base_dirs.home_dir().join(CONFIG_DIR_NAME)
            }
        };

        fs::create_dir_all(&base_path)
            .map_err(|e| AppError::io_with_source(&base_path, "create config directory", e))?;

        Ok(base_path.join(CONFIG_FILE_NAME))
    }

    /// Returns the configuration and whether the file had to be created.
    fn load_or_create(path: &Path) -> AppResult<(Config, bool)> {
        if path.exists() {
            let content =
                fs::read_to_string(path).map_err(|e| AppError::io_with_source(path, "read config file", e))?;
            let config = toml::from_str(&content)?;
            Ok((config, false))
        } else {
            let config = Config::default();
            Self::write(path, &config)?;
            Ok((config, true))
        }
    }

    fn write(path: &Path, config: &Config) -> AppResult<()> {
        let content = toml::to_string_pretty(config)
            .map_err(|e| AppError::config_with_source("Failed to serialize config", e))?;
        fs::write(path, content).map_err(|e| AppError::io_with_source(path, "write config file", e))
    }

    pub fn save(&self) -> AppResult<()> {
        Self::write(&self.config_path, &self.config)
    }

    /// Replace the in-memory configuration with defaults. Call [`save`](Self::save) to persist.
    pub fn reset(&mut self) {
        self.config = Config::default();
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// True when this manager wrote a fresh default file on load.
    pub fn was_created(&self) -> bool {
        self.created
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn config_dir(&self) -> &Path {
        self.config_path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Where snapshot files are kept.
    pub fn data_dir(&self) -> PathBuf {
        self.config
            .storage
            .data_dir
            .clone()
            .unwrap_or_else(|| self.config_dir().to_path_buf())
    }

    /// Read a dotted key such as `dispatcher.max_attempts`.
    pub fn get(&self, key: &str) -> AppResult<String> {
        let c = &self.config;
        let value = match key {
            "dispatcher.max_attempts" => c.dispatcher.max_attempts.to_string(),
            "dispatcher.retry_base_delay_ms" => c.dispatcher.retry_base_delay_ms.to_string(),
            "dispatcher.retry_jitter_factor" => c.dispatcher.retry_jitter_factor.to_string(),
            "dispatcher.request_timeout_secs" => c.dispatcher.request_timeout_secs.to_string(),
            "dispatcher.response_excerpt_chars" => c.dispatcher.response_excerpt_chars.to_string(),
            "dispatcher.user_agent" => display_optional(c.dispatcher.user_agent.as_deref()),
            "retention.max_records" => c.retention.max_records.to_string(),
            "device.android_version" => display_optional(c.device.android_version.as_deref()),
            "device.device_model" => display_optional(c.device.device_model.as_deref()),
            "device.device_manufacturer" => display_optional(c.device.device_manufacturer.as_deref()),
            "storage.data_dir" => {
                display_optional(c.storage.data_dir.as_ref().map(|p| p.to_string_lossy()).as_deref())
            }
            "storage.persist" => c.storage.persist.to_string(),
            "logging.level" => c.logging.level.clone(),
            "logging.file" => display_optional(c.logging.file.as_ref().map(|p| p.to_string_lossy()).as_deref()),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Set a dotted key from its string form. An empty value clears optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> AppResult<()> {
        let c = &mut self.config;
        match key {
            "dispatcher.max_attempts" => {
                c.dispatcher.max_attempts = parse_at_least(key, value, 1)?;
            }
            "dispatcher.retry_base_delay_ms" => c.dispatcher.retry_base_delay_ms = parse(key, value)?,
            "dispatcher.retry_jitter_factor" => {
                let factor: f64 = parse(key, value)?;
                if !(0.0..=1.0).contains(&factor) {
                    return Err(AppError::invalid_config_value(key, value));
                }
                c.dispatcher.retry_jitter_factor = factor;
            }
            "dispatcher.request_timeout_secs" => {
                c.dispatcher.request_timeout_secs = parse_at_least(key, value, 1)?;
            }
            "dispatcher.response_excerpt_chars" => c.dispatcher.response_excerpt_chars = parse(key, value)?,
            "dispatcher.user_agent" => c.dispatcher.user_agent = optional(value),
            "retention.max_records" => c.retention.max_records = parse_at_least(key, value, 1)?,
            "device.android_version" => c.device.android_version = optional(value),
            "device.device_model" => c.device.device_model = optional(value),
            "device.device_manufacturer" => c.device.device_manufacturer = optional(value),
            "storage.data_dir" => c.storage.data_dir = optional(value).map(PathBuf::from),
            "storage.persist" => c.storage.persist = parse(key, value)?,
            "logging.level" => {
                let level = value.to_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(AppError::invalid_config_value(key, value));
                }
                c.logging.level = level;
            }
            "logging.file" => c.logging.file = optional(value).map(PathBuf::from),
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }
}

fn unknown_key(key: &str) -> AppError {
    AppError::config(format!("Unknown configuration key: {key}"))
}

fn display_optional(value: Option<&str>) -> String {
    value.unwrap_or("None").to_string()
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse<T>(key: &str, value: &str) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.trim().parse().map_err(|e| AppError::InvalidConfigValue {
        key: key.to_string(),
        value: value.to_string(),
        source: Some(Box::new(e)),
    })
}

fn parse_at_least<T>(key: &str, value: &str, min: T) -> AppResult<T>
where
    T: FromStr + PartialOrd,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let parsed = parse(key, value)?;
    if parsed < min {
        return Err(AppError::invalid_config_value(key, value));
    }
    Ok(parsed)
}
