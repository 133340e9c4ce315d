//! Notifications currently shown on the device.
//!
//! The observation layer replaces the whole list whenever the set of shown
//! notifications changes; readers take a cheap `Arc` snapshot and never see a
//! half-updated list.

use std::sync::{Arc, RwLock};

use crate::matcher::TriggerMatcher;
use crate::model::{NotificationEvent, TriggerRule};

#[derive(Debug, Default)]
pub struct ActiveNotifications {
    current: RwLock<Arc<Vec<NotificationEvent>>>,
}

impl ActiveNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new list of shown notifications.
    pub fn replace(&self, events: Vec<NotificationEvent>) {
        let next = Arc::new(events);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    pub fn snapshot(&self) -> Arc<Vec<NotificationEvent>> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Shown notifications that `rules` would forward.
    pub fn preview(&self, rules: &[TriggerRule]) -> Vec<NotificationEvent> {
        let matcher = TriggerMatcher::new();
        self.snapshot()
            .iter()
            .filter(|event| matcher.matches_any(event, rules))
            .cloned()
            .collect()
    }
}
