//! Persistent key-value storage for cache records.
//!
//! Everything the crate persists goes through the [`KeyValueStore`] trait:
//! a thin, namespaced string store. Higher layers serialize whole records
//! to JSON via [`load_record`]/[`save_record`]. Failures are surfaced to
//! the caller, never swallowed - the caches decide whether to log-and-
//! continue or propagate.
//!
//! Two implementations:
//! - [`FileStore`]: one JSON file per key under a cache directory
//! - [`MemoryStore`]: in-memory map, used by tests and previews

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("record serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Contract over device-local key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
    async fn remove_many(&self, keys: &[String]) -> Result<(), StorageError>;
}

/// Load and deserialize a record, `None` on a missing key.
pub async fn load_record<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize and persist a record under `key`.
pub async fn save_record<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw).await
}

// ===== In-memory store =====

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.lock().await.remove(key);
        Ok(())
    }

    async fn remove_many(&self, keys: &[String]) -> Result<(), StorageError> {
        let mut values = self.values.lock().await;
        for key in keys {
            values.remove(key);
        }
        Ok(())
    }
}

// ===== File-backed store =====

/// One JSON file per key under a cache directory.
///
/// Payloads are small JSON records, so reads and writes go straight through
/// `std::fs`; the contract stays async for callers.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&path)?))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if path.exists() {
            std::fs::remove_file(&path)?;
        } else {
            debug!(key, "remove of absent key");
        }
        Ok(())
    }

    async fn remove_many(&self, keys: &[String]) -> Result<(), StorageError> {
        for key in keys {
            self.remove(key).await?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.set("greeting", "hello").await.unwrap();
        assert_eq!(store.get("greeting").await.unwrap().as_deref(), Some("hello"));

        store.remove("greeting").await.unwrap();
        assert_eq!(store.get("greeting").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_remove_many() {
        let store = MemoryStore::new();
        store.set("a", "1").await.unwrap();
        store.set("b", "2").await.unwrap();
        store.set("c", "3").await.unwrap();

        store
            .remove_many(&["a".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("b").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.get("c").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_record_helpers_roundtrip() {
        let store = MemoryStore::new();
        let sample = Sample {
            name: "psalms".to_string(),
            count: 150,
        };
        save_record(&store, "sample", &sample).await.unwrap();

        let loaded: Option<Sample> = load_record(&store, "sample").await.unwrap();
        assert_eq!(loaded, Some(sample));

        let missing: Option<Sample> = load_record(&store, "absent").await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_load_record_surfaces_corrupt_payload() {
        let store = MemoryStore::new();
        store.set("sample", "{not json").await.unwrap();

        let result: Result<Option<Sample>, _> = load_record(&store, "sample").await;
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        store.set("prefs", r#"{"theme":"dark"}"#).await.unwrap();
        assert_eq!(
            store.get("prefs").await.unwrap().as_deref(),
            Some(r#"{"theme":"dark"}"#)
        );

        // Removing a key that was never written is not an error.
        store.remove("absent").await.unwrap();
        store.remove("prefs").await.unwrap();
        assert_eq!(store.get("prefs").await.unwrap(), None);
    }
}
