//! Key-value persistence for configuration, ledgers, and alerts.
//!
//! The contract is deliberately small: string keys mapping to JSON blobs
//! that survive process restart. `JsonFileStore` is the shipped default
//! (one file per key under a state directory); `MemoryStore` backs tests
//! and hosts that manage durability themselves.

use adaptune_common::TuneError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

/// Persisted key-value blobs.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Fetch the blob for `key`, `None` if never written.
    async fn get(&self, key: &str) -> Result<Option<String>, TuneError>;

    /// Write (or overwrite) the blob for `key`.
    async fn put(&self, key: &str, value: &str) -> Result<(), TuneError>;
}

/// Volatile store for tests and embedding hosts.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, TuneError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), TuneError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-backed store: `<dir>/<key>.json`, written atomically via a temp
/// file so a crash mid-save never leaves a truncated blob.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn persistence_err(key: &str, err: impl std::fmt::Display) -> TuneError {
        TuneError::Persistence {
            key: key.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, TuneError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::persistence_err(key, e)),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), TuneError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Self::persistence_err(key, e))?;

        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|e| Self::persistence_err(key, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Self::persistence_err(key, e))?;

        debug!(key, path = %path.display(), "state blob saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.get("tuning_config").await.unwrap().is_none());
        store.put("tuning_config", "{}").await.unwrap();
        assert_eq!(store.get("tuning_config").await.unwrap().unwrap(), "{}");
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = TempDir::new().unwrap();

        {
            let store = JsonFileStore::new(dir.path());
            store.put("tuning_config", "{\"a\":1}").await.unwrap();
        }

        let reopened = JsonFileStore::new(dir.path());
        assert_eq!(
            reopened.get("tuning_config").await.unwrap().unwrap(),
            "{\"a\":1}"
        );
        assert!(reopened.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_overwrites_in_place() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.put("k", "1").await.unwrap();
        store.put("k", "2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().unwrap(), "2");
    }
}
