use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex, RwLock};
use tracing::debug;

use super::{DeliveryLogSnapshot, DeliveryLogStore, SnapshotFile};
use crate::errors::AppResult;
use crate::model::{DeliveryRecord, RecordFilter};

/// Number of delivery records kept when no other cap is configured.
pub const DEFAULT_RETENTION_CAP: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LogState {
    records: Vec<DeliveryRecord>,
    next_id: i64,
}

impl Default for LogState {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            next_id: 1,
        }
    }
}

impl LogState {
    fn newest_first(&self) -> Vec<DeliveryRecord> {
        let mut records = self.records.clone();
        records.sort_by(|a, b| b.sent_at.cmp(&a.sent_at).then(b.id.cmp(&a.id)));
        records
    }
}

/// In-process [`DeliveryLogStore`] with optional JSON snapshot persistence.
///
/// Changes apply to the live state first. The snapshot is written after the
/// state lock is released, so queries never wait on disk. A failed write is
/// returned to the caller; the next successful write brings the file up to
/// date.
pub struct MemoryDeliveryLogStore {
    state: RwLock<LogState>,
    snapshot: Option<SnapshotFile>,
    writer: Mutex<()>,
    notifier: watch::Sender<DeliveryLogSnapshot>,
}

impl MemoryDeliveryLogStore {
    pub fn new() -> Self {
        Self::with_state(LogState::default(), None)
    }

    pub fn open(file: SnapshotFile) -> AppResult<Self> {
        let state = file.load::<LogState>()?.unwrap_or_default();
        debug!("Loaded {} delivery records from {:?}", state.records.len(), file.path());
        Ok(Self::with_state(state, Some(file)))
    }

    fn with_state(state: LogState, snapshot: Option<SnapshotFile>) -> Self {
        let (notifier, _) = watch::channel(Arc::new(state.newest_first()));
        Self {
            state: RwLock::new(state),
            snapshot,
            writer: Mutex::new(()),
            notifier,
        }
    }

    async fn commit<R>(&self, change: impl FnOnce(&mut LogState) -> R) -> AppResult<R> {
        let mut guard = self.state.write().await;
        let result = change(&mut guard);
        self.notifier.send_replace(Arc::new(guard.newest_first()));

        let Some(file) = &self.snapshot else {
            return Ok(result);
        };
        let content = file.encode(&*guard)?;
        // Taken before the state lock is released so files land in commit order.
        let _writer = self.writer.lock().await;
        drop(guard);

        file.write(content).await?;
        Ok(result)
    }
}

impl Default for MemoryDeliveryLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryLogStore for MemoryDeliveryLogStore {
    async fn insert(&self, mut record: DeliveryRecord) -> AppResult<i64> {
        self.commit(|state| {
            record.id = state.next_id;
            state.next_id += 1;
            let id = record.id;
            state.records.push(record);
            id
        })
        .await
    }

    /// Insert and trim in one commit, so the snapshot is rewritten once.
    async fn insert_capped(&self, mut record: DeliveryRecord, keep: usize) -> AppResult<i64> {
        self.commit(|state| {
            record.id = state.next_id;
            state.next_id += 1;
            let id = record.id;
            state.records.push(record);
            if state.records.len() > keep {
                let mut records = state.newest_first();
                records.truncate(keep);
                state.records = records;
            }
            id
        })
        .await
    }

    async fn query(&self, filter: &RecordFilter, limit: usize) -> AppResult<Vec<DeliveryRecord>> {
        let state = self.state.read().await;
        Ok(state
            .newest_first()
            .into_iter()
            .filter(|r| filter.accepts(r))
            .take(limit)
            .collect())
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(self.state.read().await.records.len())
    }

    async fn delete_all(&self) -> AppResult<usize> {
        self.commit(|state| std::mem::take(&mut state.records).len()).await
    }

    async fn delete_older_than(&self, timestamp: i64) -> AppResult<usize> {
        self.commit(|state| {
            let before = state.records.len();
            state.records.retain(|r| r.sent_at >= timestamp);
            before - state.records.len()
        })
        .await
    }

    async fn prune_to(&self, keep: usize) -> AppResult<usize> {
        if self.count().await? <= keep {
            return Ok(0);
        }
        self.commit(|state| {
            let mut records = state.newest_first();
            let removed = records.len().saturating_sub(keep);
            records.truncate(keep);
            state.records = records;
            removed
        })
        .await
    }

    fn subscribe(&self) -> watch::Receiver<DeliveryLogSnapshot> {
        self.notifier.subscribe()
    }
}

/// Delivery log with bounded retention.
///
/// Every [`record`](DeliveryLog::record) is followed by a best-effort prune
/// down to the retention cap. A failing prune is logged and never turns a
/// successful insert into an error.
#[derive(Clone)]
pub struct DeliveryLog {
    store: Arc<dyn DeliveryLogStore>,
    cap: usize,
}

impl DeliveryLog {
    pub fn new(store: Arc<dyn DeliveryLogStore>, cap: usize) -> Self {
        Self { store, cap: cap.max(1) }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Append a record, then enforce the retention cap.
    pub async fn record(&self, record: DeliveryRecord) -> AppResult<i64> {
        self.store.insert_capped(record, self.cap).await
    }

    /// Newest records first, bounded by the retention cap.
    pub async fn recent(&self, filter: &RecordFilter) -> AppResult<Vec<DeliveryRecord>> {
        self.store.query(filter, self.cap).await
    }

    pub async fn count(&self) -> AppResult<usize> {
        self.store.count().await
    }

    pub async fn clear(&self) -> AppResult<usize> {
        self.store.delete_all().await
    }

    pub async fn delete_older_than(&self, timestamp: i64) -> AppResult<usize> {
        self.store.delete_older_than(timestamp).await
    }

    pub fn subscribe(&self) -> watch::Receiver<DeliveryLogSnapshot> {
        self.store.subscribe()
    }
}
