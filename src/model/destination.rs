use std::collections::BTreeMap;

use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{AppError, AppResult};

/// A webhook endpoint that notification events may be forwarded to.
///
/// Owns zero or more [`TriggerRule`](super::TriggerRule)s; without at least
/// one enabled rule nothing is ever sent to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Store-assigned identifier, 0 until inserted.
    #[serde(default)]
    pub id: i64,

    /// Target URL, must be http or https.
    pub url: String,

    /// Extra request headers sent with every delivery.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Creation time in epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,

    /// Last update time in epoch milliseconds.
    #[serde(default)]
    pub updated_at: i64,
}

fn default_enabled() -> bool {
    true
}

impl Destination {
    /// Create an enabled destination with no extra headers.
    pub fn new(url: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: 0,
            url: url.into(),
            headers: BTreeMap::new(),
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Check the URL and headers before the destination is stored.
    ///
    /// Rejects anything that is not an absolute http(s) URL with a host, and
    /// header names or values that could not be put on the wire.
    pub fn validate(&self) -> AppResult<()> {
        let parsed = Url::parse(self.url.trim()).map_err(|e| AppError::InvalidDestinationUrl {
            url: self.url.clone(),
            source: Some(Box::new(e)),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(AppError::InvalidDestinationUrl {
                url: self.url.clone(),
                source: None,
            });
        }

        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| AppError::validation("headers", format!("invalid header name '{}'", name)))?;
            HeaderValue::from_str(value)
                .map_err(|_| AppError::validation("headers", format!("invalid value for header '{}'", name)))?;
        }

        Ok(())
    }
}
