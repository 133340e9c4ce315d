use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::delivery::{DeviceInfo, DispatchSettings, RetryPolicy};
use crate::store::DEFAULT_RETENTION_CAP;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dispatcher: DispatcherConfig,
    pub retention: RetentionConfig,
    pub device: DeviceConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_jitter_factor: f64,
    pub request_timeout_secs: u64,
    pub response_excerpt_chars: usize,
    pub user_agent: Option<String>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_base_delay_ms: 1000,
            retry_jitter_factor: 0.0,
            request_timeout_secs: 30,
            response_excerpt_chars: 500,
            user_agent: Some(format!("notification-forwarder/{}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

impl DispatcherConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::linear(self.max_attempts, self.retry_base_delay_ms).with_jitter(self.retry_jitter_factor)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Response bytes worth reading: enough for the excerpt in any UTF-8 text.
    pub fn response_body_limit(&self) -> usize {
        self.response_excerpt_chars.saturating_mul(4)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub max_records: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_RETENTION_CAP,
        }
    }
}

/// Values reported in the payload `device` block. Unset fields fall back to the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub android_version: Option<String>,
    pub device_model: Option<String>,
    pub device_manufacturer: Option<String>,
}

impl DeviceConfig {
    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo::with_overrides(
            self.android_version.as_deref(),
            self.device_model.as_deref(),
            self.device_manufacturer.as_deref(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for snapshot files; the config directory when unset
    pub data_dir: Option<PathBuf>,
    /// Keep destinations and delivery records across runs
    pub persist: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            persist: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Daily rolling log file; stderr only when unset
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            retry: self.dispatcher.retry_policy(),
            response_excerpt_chars: self.dispatcher.response_excerpt_chars,
            device: self.device.device_info(),
        }
    }
}
