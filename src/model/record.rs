use serde::{Deserialize, Serialize};

use super::{Destination, NotificationEvent};

/// Outcome of forwarding one event to one destination.
///
/// Append-only: written once after the final attempt and never changed.
/// The destination URL is copied so the record survives destination edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    #[serde(default)]
    pub id: i64,
    pub destination_id: i64,
    pub destination_url: String,
    pub package_name: String,
    pub app_name: String,
    pub title: Option<String>,
    pub text: Option<String>,
    pub priority: i32,
    pub timestamp: i64,
    pub icon_base64: Option<String>,
    pub http_status_code: Option<u16>,
    pub success: bool,
    pub error_message: Option<String>,
    /// Truncated excerpt of the last response body.
    pub response_body: Option<String>,
    /// Epoch milliseconds when the delivery finished.
    pub sent_at: i64,
}

impl DeliveryRecord {
    /// Start a record for `event` sent to `destination`; outcome fields empty.
    pub fn for_event(destination: &Destination, event: &NotificationEvent) -> Self {
        Self {
            id: 0,
            destination_id: destination.id,
            destination_url: destination.url.clone(),
            package_name: event.package_name().to_string(),
            app_name: event.app_name().to_string(),
            title: event.title().map(str::to_string),
            text: event.text().map(str::to_string),
            priority: event.priority(),
            timestamp: event.timestamp(),
            icon_base64: event.icon_base64().map(str::to_string),
            http_status_code: None,
            success: false,
            error_message: None,
            response_body: None,
            sent_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Which records a delivery log query returns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RecordFilter {
    #[default]
    All,
    Success(bool),
    Package(String),
}

impl RecordFilter {
    pub fn accepts(&self, record: &DeliveryRecord) -> bool {
        match self {
            RecordFilter::All => true,
            RecordFilter::Success(success) => record.success == *success,
            RecordFilter::Package(package) => record.package_name == *package,
        }
    }
}
