//! Trigger rule evaluation
//!
//! Decides whether a [`NotificationEvent`] satisfies a [`TriggerRule`]. The
//! matcher is pure: no I/O, no shared state, and the same `(event, rule)` pair
//! always gives the same answer, so it can be called from any task without
//! locking.

use fancy_regex::Regex;
use tracing::trace;

use crate::errors::{AppError, AppResult};
use crate::model::{NotificationEvent, PatternMode, TriggerRule};

const CONTENT_SEPARATOR: char = ' ';

/// Evaluates events against trigger rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerMatcher;

impl TriggerMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Returns true when `rule` is enabled and every filter it sets accepts `event`.
    ///
    /// A malformed regular expression makes the rule evaluate to false; it is
    /// never reported as an error here. Use [`TriggerMatcher::validate_pattern`]
    /// to surface it at configuration time.
    pub fn matches_rule(&self, event: &NotificationEvent, rule: &TriggerRule) -> bool {
        if !rule.enabled {
            return false;
        }

        // Package filter is always a plain substring, whatever the pattern mode.
        if let Some(filter) = non_blank(rule.package_filter.as_deref()) {
            if !contains_ignore_case(event.package_name(), filter) {
                return false;
            }
        }

        if let Some(filter) = non_blank(rule.content_filter.as_deref()) {
            let content = searchable_content(event);
            let found = match rule.pattern_mode {
                PatternMode::Regex => match compile(filter).and_then(|regex| regex.is_match(&content)) {
                    Ok(found) => found,
                    Err(e) => {
                        trace!(rule_id = rule.id, "content regex failed: {}", e);
                        return false;
                    }
                },
                PatternMode::Text => contains_ignore_case(&content, filter),
            };

            if !found {
                return false;
            }
        }

        (rule.min_priority..=rule.max_priority).contains(&event.priority())
    }

    /// Returns true when at least one rule matches.
    ///
    /// An empty rule set never matches: a destination only receives events
    /// it has explicitly opted into.
    pub fn matches_any(&self, event: &NotificationEvent, rules: &[TriggerRule]) -> bool {
        !rules.is_empty() && rules.iter().any(|rule| self.matches_rule(event, rule))
    }

    /// Check that a regex-mode content filter compiles.
    pub fn validate_pattern(&self, rule: &TriggerRule) -> AppResult<()> {
        if rule.pattern_mode != PatternMode::Regex {
            return Ok(());
        }
        match non_blank(rule.content_filter.as_deref()) {
            Some(pattern) => compile(pattern)
                .map(|_| ())
                .map_err(|e| AppError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(()),
        }
    }
}

/// Case-insensitive pattern with lookaround and backreference support.
fn compile(pattern: &str) -> Result<Regex, fancy_regex::Error> {
    Regex::new(&format!("(?i){pattern}"))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Title, text, sub-text and big text, each present one followed by a separator.
fn searchable_content(event: &NotificationEvent) -> String {
    let mut content = String::new();
    for part in [event.title(), event.text(), event.sub_text(), event.big_text()]
        .into_iter()
        .flatten()
    {
        content.push_str(part);
        content.push(CONTENT_SEPARATOR);
    }
    content
}
