use serde::{Deserialize, Serialize};

use super::event::{PRIORITY_MAX, PRIORITY_MIN};

/// How a rule's content filter is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternMode {
    /// Case-insensitive substring containment.
    #[default]
    Text,
    /// Case-insensitive regular expression, matched anywhere in the content.
    Regex,
}

/// A condition under which a destination receives an event.
///
/// A rule belongs to exactly one destination and is deleted with it.
/// `min_priority <= max_priority` is expected but not enforced; a rule with an
/// inverted range never matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRule {
    /// Store-assigned identifier, 0 until inserted.
    #[serde(default)]
    pub id: i64,

    /// Owning destination.
    pub destination_id: i64,

    /// Case-insensitive substring of the source package name.
    #[serde(default)]
    pub package_filter: Option<String>,

    /// Text or regex searched in title, text, sub-text and big text.
    #[serde(default)]
    pub content_filter: Option<String>,

    #[serde(default)]
    pub pattern_mode: PatternMode,

    #[serde(default = "default_min_priority")]
    pub min_priority: i32,

    #[serde(default = "default_max_priority")]
    pub max_priority: i32,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_min_priority() -> i32 {
    PRIORITY_MIN
}

fn default_max_priority() -> i32 {
    PRIORITY_MAX
}

fn default_enabled() -> bool {
    true
}

impl TriggerRule {
    /// Create an enabled rule that matches every event for the destination.
    pub fn new(destination_id: i64) -> Self {
        Self {
            id: 0,
            destination_id,
            package_filter: None,
            content_filter: None,
            pattern_mode: PatternMode::Text,
            min_priority: PRIORITY_MIN,
            max_priority: PRIORITY_MAX,
            enabled: true,
        }
    }

    pub fn with_package_filter(mut self, filter: impl Into<String>) -> Self {
        self.package_filter = Some(filter.into());
        self
    }

    /// Plain-text content filter.
    pub fn with_content_filter(mut self, filter: impl Into<String>) -> Self {
        self.content_filter = Some(filter.into());
        self.pattern_mode = PatternMode::Text;
        self
    }

    /// Regular-expression content filter.
    pub fn with_content_regex(mut self, pattern: impl Into<String>) -> Self {
        self.content_filter = Some(pattern.into());
        self.pattern_mode = PatternMode::Regex;
        self
    }

    pub fn with_priority_range(mut self, min: i32, max: i32) -> Self {
        self.min_priority = min;
        self.max_priority = max;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// True when the priority window is empty and the rule can never match.
    pub fn has_inverted_priority_range(&self) -> bool {
        self.min_priority > self.max_priority
    }
}
