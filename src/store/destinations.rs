use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};

use super::{DestinationSnapshot, DestinationStore, SnapshotFile};
use crate::errors::{AppError, AppResult};
use crate::model::{Destination, TriggerRule};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DestinationState {
    destinations: Vec<Destination>,
    rules: Vec<TriggerRule>,
    next_destination_id: i64,
    next_rule_id: i64,
}

impl Default for DestinationState {
    fn default() -> Self {
        Self {
            destinations: Vec::new(),
            rules: Vec::new(),
            next_destination_id: 1,
            next_rule_id: 1,
        }
    }
}

impl DestinationState {
    fn newest_first(&self) -> Vec<Destination> {
        let mut list = self.destinations.clone();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        list
    }

    fn has_destination(&self, id: i64) -> bool {
        self.destinations.iter().any(|d| d.id == id)
    }
}

/// In-process [`DestinationStore`].
///
/// Every write runs against a copy of the state under the write lock, is
/// persisted if a snapshot file is configured, and only then replaces the
/// live state. A failed write leaves the store unchanged.
pub struct MemoryDestinationStore {
    state: RwLock<DestinationState>,
    snapshot: Option<SnapshotFile>,
    notifier: watch::Sender<DestinationSnapshot>,
}

impl MemoryDestinationStore {
    /// Memory-only store, nothing survives the process.
    pub fn new() -> Self {
        Self::with_state(DestinationState::default(), None)
    }

    /// Store mirrored to `file`, loading any previous snapshot.
    pub fn open(file: SnapshotFile) -> AppResult<Self> {
        let state = file.load::<DestinationState>()?.unwrap_or_default();
        debug!(
            "Loaded {} destinations and {} rules from {:?}",
            state.destinations.len(),
            state.rules.len(),
            file.path()
        );
        Ok(Self::with_state(state, Some(file)))
    }

    fn with_state(state: DestinationState, snapshot: Option<SnapshotFile>) -> Self {
        let (notifier, _) = watch::channel(Arc::new(state.newest_first()));
        Self {
            state: RwLock::new(state),
            snapshot,
            notifier,
        }
    }

    async fn commit<R>(&self, change: impl FnOnce(&mut DestinationState) -> AppResult<R>) -> AppResult<R> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let result = change(&mut next)?;

        if let Some(file) = &self.snapshot {
            file.save(&next).await?;
        }

        *guard = next;
        self.notifier.send_replace(Arc::new(guard.newest_first()));
        Ok(result)
    }
}

impl Default for MemoryDestinationStore {
    fn default() -> Self {
        Self::new()
    }
}

fn warn_on_inverted_range(rule: &TriggerRule) {
    if rule.has_inverted_priority_range() {
        warn!(
            "Trigger rule {} has min priority {} above max priority {} and will never match",
            rule.id, rule.min_priority, rule.max_priority
        );
    }
}

#[async_trait]
impl DestinationStore for MemoryDestinationStore {
    async fn list_destinations(&self) -> AppResult<Vec<Destination>> {
        Ok(self.state.read().await.newest_first())
    }

    async fn list_enabled_destinations(&self) -> AppResult<Vec<Destination>> {
        let state = self.state.read().await;
        Ok(state.newest_first().into_iter().filter(|d| d.enabled).collect())
    }

    async fn get_destination(&self, id: i64) -> AppResult<Option<Destination>> {
        let state = self.state.read().await;
        Ok(state.destinations.iter().find(|d| d.id == id).cloned())
    }

    async fn insert_destination(&self, mut destination: Destination) -> AppResult<i64> {
        destination.validate()?;
        self.commit(|state| {
            let now = chrono::Utc::now().timestamp_millis();
            destination.id = state.next_destination_id;
            state.next_destination_id += 1;
            if destination.created_at == 0 {
                destination.created_at = now;
            }
            destination.updated_at = now;
            let id = destination.id;
            state.destinations.push(destination);
            Ok(id)
        })
        .await
    }

    async fn update_destination(&self, mut destination: Destination) -> AppResult<()> {
        destination.validate()?;
        self.commit(|state| {
            let existing = state
                .destinations
                .iter_mut()
                .find(|d| d.id == destination.id)
                .ok_or(AppError::DestinationNotFound { id: destination.id })?;
            destination.created_at = existing.created_at;
            destination.updated_at = chrono::Utc::now().timestamp_millis();
            *existing = destination;
            Ok(())
        })
        .await
    }

    async fn delete_destination(&self, id: i64) -> AppResult<bool> {
        self.commit(|state| {
            if !state.has_destination(id) {
                return Ok(false);
            }
            // Rules first, then the destination, inside the same write.
            state.rules.retain(|r| r.destination_id != id);
            state.destinations.retain(|d| d.id != id);
            Ok(true)
        })
        .await
    }

    async fn list_rules(&self, destination_id: i64) -> AppResult<Vec<TriggerRule>> {
        let state = self.state.read().await;
        Ok(state
            .rules
            .iter()
            .filter(|r| r.destination_id == destination_id)
            .cloned()
            .collect())
    }

    async fn get_rule(&self, id: i64) -> AppResult<Option<TriggerRule>> {
        let state = self.state.read().await;
        Ok(state.rules.iter().find(|r| r.id == id).cloned())
    }

    async fn insert_rule(&self, mut rule: TriggerRule) -> AppResult<i64> {
        self.commit(|state| {
            if !state.has_destination(rule.destination_id) {
                return Err(AppError::DestinationNotFound { id: rule.destination_id });
            }
            rule.id = state.next_rule_id;
            state.next_rule_id += 1;
            warn_on_inverted_range(&rule);
            let id = rule.id;
            state.rules.push(rule);
            Ok(id)
        })
        .await
    }

    async fn update_rule(&self, rule: TriggerRule) -> AppResult<()> {
        self.commit(|state| {
            if !state.has_destination(rule.destination_id) {
                return Err(AppError::DestinationNotFound { id: rule.destination_id });
            }
            let existing = state
                .rules
                .iter_mut()
                .find(|r| r.id == rule.id)
                .ok_or(AppError::RuleNotFound { id: rule.id })?;
            warn_on_inverted_range(&rule);
            *existing = rule;
            Ok(())
        })
        .await
    }

    async fn delete_rule(&self, id: i64) -> AppResult<bool> {
        self.commit(|state| {
            let before = state.rules.len();
            state.rules.retain(|r| r.id != id);
            Ok(state.rules.len() != before)
        })
        .await
    }

    async fn list_enabled_rules(&self) -> AppResult<Vec<TriggerRule>> {
        let state = self.state.read().await;
        Ok(state.rules.iter().filter(|r| r.enabled).cloned().collect())
    }

    async fn count_destinations(&self) -> AppResult<usize> {
        Ok(self.state.read().await.destinations.len())
    }

    fn subscribe(&self) -> watch::Receiver<DestinationSnapshot> {
        self.notifier.subscribe()
    }
}
