//! JSON body posted to webhook destinations.

use serde::{Deserialize, Serialize};

use crate::model::NotificationEvent;

const UNKNOWN: &str = "unknown";

/// Identifies the device an event was observed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub android_version: String,
    pub device_model: String,
    pub device_manufacturer: String,
}

impl DeviceInfo {
    /// Describe the host this process runs on.
    pub fn from_host() -> Self {
        let device_model = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());

        Self {
            android_version: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            device_model,
            device_manufacturer: UNKNOWN.to_string(),
        }
    }

    /// Host defaults with any configured values taking precedence.
    pub fn with_overrides(
        android_version: Option<&str>,
        device_model: Option<&str>,
        device_manufacturer: Option<&str>,
    ) -> Self {
        let host = Self::from_host();
        Self {
            android_version: android_version.map(str::to_string).unwrap_or(host.android_version),
            device_model: device_model.map(str::to_string).unwrap_or(host.device_model),
            device_manufacturer: device_manufacturer
                .map(str::to_string)
                .unwrap_or(host.device_manufacturer),
        }
    }
}

/// Webhook request body.
///
/// Optional event fields serialize as `null` rather than being omitted, so
/// receivers always see the same set of keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub package_name: String,
    pub app_name: String,
    pub title: Option<String>,
    pub text: Option<String>,
    pub sub_text: Option<String>,
    pub big_text: Option<String>,
    pub priority: i32,
    pub timestamp: i64,
    pub icon_base64: Option<String>,
    pub device: DeviceInfo,
}

impl WebhookPayload {
    pub fn new(event: &NotificationEvent, device: &DeviceInfo) -> Self {
        Self {
            package_name: event.package_name().to_string(),
            app_name: event.app_name().to_string(),
            title: event.title().map(str::to_string),
            text: event.text().map(str::to_string),
            sub_text: event.sub_text().map(str::to_string),
            big_text: event.big_text().map(str::to_string),
            priority: event.priority(),
            timestamp: event.timestamp(),
            icon_base64: event.icon_base64().map(str::to_string),
            device: device.clone(),
        }
    }
}
