// src/db/session_store.rs
//
// Persistence for chat sessions. A session is stored as one JSON blob under
// `sapphire-chat-v1:<session id>`, so a schema change only needs a new prefix.

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

pub const STORAGE_KEY: &str = "sapphire-chat-v1";

pub fn storage_key(session_id: &Uuid) -> String {
    format!("{STORAGE_KEY}:{session_id}")
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn save(&self, key: &str, blob: String) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
    /// Deletes every blob for which `is_stale` holds; returns how many went.
    async fn purge(&self, is_stale: &(dyn for<'a> Fn(&'a str) -> bool + Send + Sync)) -> Result<usize, StoreError>;
}

// --- In memory ---

#[derive(Clone, Default)]
pub struct MemorySessionStore {
    blobs: Arc<DashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.blobs.get(key).map(|blob| blob.value().clone()))
    }

    async fn save(&self, key: &str, blob: String) -> Result<(), StoreError> {
        self.blobs.insert(key.to_string(), blob);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.blobs.remove(key);
        Ok(())
    }

    async fn purge(&self, is_stale: &(dyn for<'a> Fn(&'a str) -> bool + Send + Sync)) -> Result<usize, StoreError> {
        let mut removed = 0;
        self.blobs.retain(|_, blob| {
            let stale = is_stale(blob.as_str());
            removed += usize::from(stale);
            !stale
        });
        Ok(removed)
    }
}


// --- On disk ---

/// One file per session inside `dir`. Survives restarts.
#[derive(Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // ':' is not portable in file names.
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, key: &str, blob: String) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, blob).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn purge(&self, is_stale: &(dyn for<'a> Fn(&'a str) -> bool + Send + Sync)) -> Result<usize, StoreError> {
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            // Skips `*.json.tmp` leftovers of an interrupted save.
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            let blob = match tokio::fs::read_to_string(&path).await {
                Ok(blob) => blob,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if !is_stale(&blob) {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_carries_version_prefix() {
        let id = Uuid::nil();
        assert_eq!(
            storage_key(&id),
            "sapphire-chat-v1:00000000-0000-0000-0000-000000000000"
        );
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemorySessionStore::new();
        assert_eq!(store.load("k").await.unwrap(), None);

        store.save("k", "{}".into()).await.unwrap();
        assert_eq!(store.load("k").await.unwrap().as_deref(), Some("{}"));

        store.remove("k").await.unwrap();
        assert_eq!(store.load("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_persists_between_instances() {
        let dir = tempfile::tempdir().unwrap();
        let key = storage_key(&Uuid::new_v4());

        let store = FileSessionStore::new(dir.path()).await.unwrap();
        store.save(&key, r#"{"a":1}"#.into()).await.unwrap();

        let reopened = FileSessionStore::new(dir.path()).await.unwrap();
        assert_eq!(reopened.load(&key).await.unwrap().as_deref(), Some(r#"{"a":1}"#));

        reopened.remove(&key).await.unwrap();
        reopened.remove(&key).await.unwrap();
        assert_eq!(reopened.load(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_purge_drops_only_stale_blobs() {
        let store = MemorySessionStore::new();
        store.save("old", "stale".into()).await.unwrap();
        store.save("new", "fresh".into()).await.unwrap();

        let removed = store.purge(&|blob: &str| blob == "stale").await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.load("new").await.unwrap().as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn file_purge_removes_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path()).await.unwrap();
        let stale = storage_key(&Uuid::new_v4());
        let fresh = storage_key(&Uuid::new_v4());
        store.save(&stale, "stale".into()).await.unwrap();
        store.save(&fresh, "fresh".into()).await.unwrap();

        assert_eq!(store.purge(&|blob: &str| blob == "stale").await.unwrap(), 1);
        assert_eq!(store.load(&stale).await.unwrap(), None);
        assert_eq!(store.load(&fresh).await.unwrap().as_deref(), Some("fresh"));
    }
}
