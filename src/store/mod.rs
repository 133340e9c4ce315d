//! Persistence contracts for destinations, trigger rules and delivery records.
//!
//! The dispatcher only talks to the [`DestinationStore`] and
//! [`DeliveryLogStore`] traits. The in-process implementations keep state in
//! memory behind a `tokio::sync::RwLock` (one writer at a time, concurrent
//! readers) and can mirror it to JSON snapshot files.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::errors::AppResult;
use crate::model::{DeliveryRecord, Destination, RecordFilter, TriggerRule};

pub mod delivery_log;
pub mod destinations;
pub mod snapshot;

pub use delivery_log::{DeliveryLog, MemoryDeliveryLogStore, DEFAULT_RETENTION_CAP};
pub use destinations::MemoryDestinationStore;
pub use snapshot::SnapshotFile;

/// Full list of destinations, published whenever destinations or rules change.
pub type DestinationSnapshot = Arc<Vec<Destination>>;

/// Most recent delivery records (newest first), published after every change.
pub type DeliveryLogSnapshot = Arc<Vec<DeliveryRecord>>;

/// Destinations and their trigger rules.
///
/// Deleting a destination deletes its rules in the same write; no rule may
/// outlive its destination.
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// All destinations, newest first.
    async fn list_destinations(&self) -> AppResult<Vec<Destination>>;

    /// Enabled destinations only, newest first.
    async fn list_enabled_destinations(&self) -> AppResult<Vec<Destination>>;

    async fn get_destination(&self, id: i64) -> AppResult<Option<Destination>>;

    /// Validate and insert; returns the assigned id.
    async fn insert_destination(&self, destination: Destination) -> AppResult<i64>;

    /// Validate and replace an existing destination.
    async fn update_destination(&self, destination: Destination) -> AppResult<()>;

    /// Remove a destination and all of its rules. Returns false if it did not exist.
    async fn delete_destination(&self, id: i64) -> AppResult<bool>;

    async fn list_rules(&self, destination_id: i64) -> AppResult<Vec<TriggerRule>>;

    async fn get_rule(&self, id: i64) -> AppResult<Option<TriggerRule>>;

    /// Insert a rule for an existing destination; returns the assigned id.
    async fn insert_rule(&self, rule: TriggerRule) -> AppResult<i64>;

    async fn update_rule(&self, rule: TriggerRule) -> AppResult<()>;

    async fn delete_rule(&self, id: i64) -> AppResult<bool>;

    /// Enabled rules across all destinations.
    async fn list_enabled_rules(&self) -> AppResult<Vec<TriggerRule>>;

    async fn count_destinations(&self) -> AppResult<usize>;

    /// Receive a fresh destination list after every change.
    fn subscribe(&self) -> watch::Receiver<DestinationSnapshot>;
}

/// Append-only log of delivery outcomes.
#[async_trait]
pub trait DeliveryLogStore: Send + Sync {
    /// Append a record; returns the assigned id.
    async fn insert(&self, record: DeliveryRecord) -> AppResult<i64>;

    /// Records accepted by `filter`, newest first, at most `limit`.
    async fn query(&self, filter: &RecordFilter, limit: usize) -> AppResult<Vec<DeliveryRecord>>;

    async fn count(&self) -> AppResult<usize>;

    async fn delete_all(&self) -> AppResult<usize>;

    /// Remove records sent strictly before `timestamp` (epoch millis).
    async fn delete_older_than(&self, timestamp: i64) -> AppResult<usize>;

    /// Keep the `keep` most recent records by send time, drop the rest.
    async fn prune_to(&self, keep: usize) -> AppResult<usize>;

    /// Append a record, then trim to the `keep` most recent.
    ///
    /// A failed trim is logged and never fails the insert.
    async fn insert_capped(&self, record: DeliveryRecord, keep: usize) -> AppResult<i64> {
        let id = self.insert(record).await?;
        match self.count().await {
            Ok(count) if count > keep => match self.prune_to(keep).await {
                Ok(removed) => debug!("Pruned {} delivery records beyond cap {}", removed, keep),
                Err(e) => warn!("Failed to prune delivery log: {}", e),
            },
            Ok(_) => {}
            Err(e) => warn!("Failed to count delivery records for pruning: {}", e),
        }
        Ok(id)
    }

    /// Receive the newest records after every change.
    fn subscribe(&self) -> watch::Receiver<DeliveryLogSnapshot>;
}
