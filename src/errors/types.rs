//! Error types for the notification forwarder
//!
//! Every fallible operation in the crate returns [`AppError`]. Variants are
//! grouped by the part of the pipeline that produces them so that callers can
//! tell a configuration mistake from a storage fault or a network failure.

use std::path::PathBuf;
use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid configuration value for '{key}': {value}")]
    InvalidConfigValue {
        key: String,
        value: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Validation errors, raised before anything is stored or sent
    #[error("Validation error: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("Invalid destination URL: {url}")]
    InvalidDestinationUrl {
        url: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid content pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // Storage errors
    #[error("Destination not found: {id}")]
    DestinationNotFound { id: i64 },

    #[error("Trigger rule not found: {id}")]
    RuleNotFound { id: i64 },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // I/O errors
    #[error("File I/O error for '{path}': {operation}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Serialization errors
    #[error("JSON serialization error: {context}")]
    JsonSerialization {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("JSON deserialization error: {context}")]
    JsonDeserialization {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("TOML parsing error: {context}")]
    TomlParsing {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Network and HTTP errors
    #[error("HTTP request failed: {method} {url}")]
    HttpRequest {
        method: String,
        url: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Network timeout after {timeout_secs} seconds")]
    NetworkTimeout { timeout_secs: u64 },

    #[error("HTTP {status_code}: {reason}")]
    HttpStatus { status_code: u16, reason: String },

    // Generic/catch-all errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a new Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new Config error with source
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an InvalidConfigValue error
    pub fn invalid_config_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            key: key.into(),
            value: value.into(),
            source: None,
        }
    }

    /// Create a Validation error
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a new Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new I/O error with source
    pub fn io_with_source(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Io {
            path: path.into(),
            operation: operation.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Whether a delivery attempt that failed with this error may be retried.
    ///
    /// 4xx statuses are terminal, everything network shaped is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkTimeout { .. } => true,
            Self::HttpRequest { .. } => true,
            Self::HttpStatus { status_code, .. } => !(400..=499).contains(status_code),
            _ => false,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } | Self::InvalidConfigValue { .. } => "config",
            Self::Validation { .. } | Self::InvalidDestinationUrl { .. } | Self::InvalidPattern { .. } => {
                "validation"
            }
            Self::DestinationNotFound { .. } | Self::RuleNotFound { .. } | Self::Storage { .. } => "storage",
            Self::Io { .. } => "io",
            Self::JsonSerialization { .. } | Self::JsonDeserialization { .. } | Self::TomlParsing { .. } => {
                "serialization"
            }
            Self::HttpRequest { .. } | Self::NetworkTimeout { .. } | Self::HttpStatus { .. } => "network",
            Self::Internal { .. } => "internal",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_eof() {
            Self::JsonDeserialization {
                context: format!("JSON syntax error at line {} column {}", err.line(), err.column()),
                source: Some(Box::new(err)),
            }
        } else if err.is_data() {
            Self::JsonDeserialization {
                context: "JSON data error".to_string(),
                source: Some(Box::new(err)),
            }
        } else {
            Self::JsonSerialization {
                context: "JSON serialization error".to_string(),
                source: Some(Box::new(err)),
            }
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::TomlParsing {
            context: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
