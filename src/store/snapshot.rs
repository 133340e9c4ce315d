//! JSON snapshot files backing the in-process stores.
//!
//! Each store keeps its whole state in memory and, when a path is configured,
//! rewrites one JSON file after every committed write. The file is written to
//! a temporary sibling first and renamed over the old one, so a crash leaves
//! either the previous or the new snapshot on disk, never a torn file.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::errors::{AppError, AppResult, ErrorContextExt};

#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot, or `None` when no file has been written yet.
    pub fn load<T: DeserializeOwned>(&self) -> AppResult<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path).in_file_operation(&self.path, "read snapshot")?;
        let state = serde_json::from_str(&content).in_file_operation(&self.path, "parse snapshot")?;
        Ok(Some(state))
    }

    /// Compact JSON encoding of `state`, ready for [`write`](Self::write).
    pub fn encode<T: Serialize>(&self, state: &T) -> AppResult<Vec<u8>> {
        Ok(serde_json::to_vec(state)?)
    }

    /// Atomically replace the snapshot with `state`.
    pub async fn save<T: Serialize>(&self, state: &T) -> AppResult<()> {
        let content = self.encode(state)?;
        self.write(content).await
    }

    /// Atomically replace the snapshot with already encoded bytes.
    ///
    /// The file work runs on the blocking pool so a large snapshot never
    /// stalls the async workers.
    pub async fn write(&self, content: Vec<u8>) -> AppResult<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &content))
            .await
            .map_err(|e| AppError::internal(format!("snapshot writer failed: {e}")))?
    }
}

fn write_atomically(path: &Path, content: &[u8]) -> AppResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).in_file_operation(dir, "create data directory")?;

    let mut tmp = NamedTempFile::new_in(dir).in_file_operation(dir, "create temporary snapshot")?;
    tmp.write_all(content).in_file_operation(tmp.path(), "write snapshot")?;
    tmp.as_file().sync_all().in_file_operation(tmp.path(), "sync snapshot")?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .in_file_operation(path, "replace snapshot")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct State {
        items: Vec<u32>,
    }

    #[test]
    fn test_missing_file_loads_none() {
        let dir = TempDir::new().unwrap();
        let file = SnapshotFile::new(dir.path().join("state.json"));
        assert_eq!(file.load::<State>().unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let file = SnapshotFile::new(dir.path().join("nested").join("state.json"));
        file.save(&State { items: vec![1, 2, 3] }).await.unwrap();
        file.save(&State { items: vec![4] }).await.unwrap();

        assert_eq!(file.load::<State>().unwrap(), Some(State { items: vec![4] }));
    }

    #[tokio::test]
    async fn test_snapshot_is_compact_json() {
        let dir = TempDir::new().unwrap();
        let file = SnapshotFile::new(dir.path().join("state.json"));
        file.save(&State { items: vec![1, 2] }).await.unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(written, r#"{"items":[1,2]}"#);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ broken").unwrap();
        let file = SnapshotFile::new(path);
        assert!(file.load::<State>().is_err());
    }
}
