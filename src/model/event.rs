use serde::{Deserialize, Serialize};

/// Lowest notification priority reported by the platform.
pub const PRIORITY_MIN: i32 = -2;
/// Highest notification priority reported by the platform.
pub const PRIORITY_MAX: i32 = 2;

/// Immutable snapshot of one observed notification.
///
/// Built once per observed event with [`NotificationEvent::builder`] (or
/// deserialized from the event source) and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    package_name: String,
    app_name: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    sub_text: Option<String>,
    #[serde(default)]
    big_text: Option<String>,
    #[serde(default)]
    priority: i32,
    timestamp: i64,
    #[serde(default)]
    icon_base64: Option<String>,
    key: String,
}

impl NotificationEvent {
    /// Start building an event for the given source package.
    pub fn builder(package_name: impl Into<String>, app_name: impl Into<String>) -> NotificationEventBuilder {
        let package_name = package_name.into();
        NotificationEventBuilder {
            event: NotificationEvent {
                key: package_name.clone(),
                package_name,
                app_name: app_name.into(),
                title: None,
                text: None,
                sub_text: None,
                big_text: None,
                priority: 0,
                timestamp: chrono::Utc::now().timestamp_millis(),
                icon_base64: None,
            },
        }
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn sub_text(&self) -> Option<&str> {
        self.sub_text.as_deref()
    }

    pub fn big_text(&self) -> Option<&str> {
        self.big_text.as_deref()
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Occurrence time in epoch milliseconds.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn icon_base64(&self) -> Option<&str> {
        self.icon_base64.as_deref()
    }

    /// Platform key identifying this notification.
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Builder for [`NotificationEvent`]
#[derive(Debug, Clone)]
pub struct NotificationEventBuilder {
    event: NotificationEvent,
}

impl NotificationEventBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.event.title = Some(title.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.event.text = Some(text.into());
        self
    }

    pub fn sub_text(mut self, sub_text: impl Into<String>) -> Self {
        self.event.sub_text = Some(sub_text.into());
        self
    }

    pub fn big_text(mut self, big_text: impl Into<String>) -> Self {
        self.event.big_text = Some(big_text.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.event.priority = priority;
        self
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.event.timestamp = timestamp;
        self
    }

    pub fn icon_base64(mut self, icon: impl Into<String>) -> Self {
        self.event.icon_base64 = Some(icon.into());
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.event.key = key.into();
        self
    }

    pub fn build(self) -> NotificationEvent {
        self.event
    }
}
