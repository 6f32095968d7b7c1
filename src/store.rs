//! Resume Store
//!
//! Flat JSON document on disk mapping decimal user ids to resume text.
//! Every operation re-reads the whole document; writes are serialized
//! through a single async mutex so concurrent `/setup` calls cannot
//! drop each other's updates.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed resume document {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

type Document = BTreeMap<String, String>;

/// JSON-file backed resume storage
pub struct ResumeStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ResumeStore {
    /// Create a store over `path` (nothing touches the disk until `init`)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Open a store, creating an empty document if none exists
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::new(path);
        store.init().await?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the backing document as `{}` if it is absent
    pub async fn init(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;

        if tokio::fs::try_exists(&self.path).await.map_err(|e| self.io(e))? {
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| self.io(e))?;
        }

        self.write_document(&Document::new()).await?;
        debug!("Created resume document at {:?}", self.path);
        Ok(())
    }

    /// Insert or overwrite the resume for `user_id`
    pub async fn save(&self, user_id: i64, resume_text: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;

        let mut doc = self.read_document().await?;
        doc.insert(user_id.to_string(), resume_text.to_string());
        self.write_document(&doc).await?;

        debug!("Saved resume for user {} ({} bytes)", user_id, resume_text.len());
        Ok(())
    }

    /// Resume for `user_id`, or the empty string if none is stored
    pub async fn load(&self, user_id: i64) -> Result<String, StoreError> {
        let _guard = self.lock.lock().await;

        let doc = self.read_document().await?;
        Ok(doc.get(&user_id.to_string()).cloned().unwrap_or_default())
    }

    async fn read_document(&self) -> Result<Document, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(self.io(e)),
        };

        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Document::new());
        }

        serde_json::from_slice(&raw).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })
    }

    async fn write_document(&self, doc: &Document) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(doc).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        let mut tmp: OsString = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, body).await.map_err(|e| self.io(e))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| self.io(e))?;
        Ok(())
    }

    fn io(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn create_test_store() -> (ResumeStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = ResumeStore::open(temp_dir.path().join("resumes.json"))
            .await
            .expect("Failed to create store");
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_init_creates_empty_document() {
        let (store, _temp) = create_test_store().await;
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw.trim(), "{}");
    }

    #[tokio::test]
    async fn test_init_keeps_existing_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("resumes.json");
        std::fs::write(&path, r#"{"42": "existing"}"#).unwrap();

        let store = ResumeStore::open(&path).await.unwrap();
        assert_eq!(store.load(42).await.unwrap(), "existing");
    }

    #[tokio::test]
    async fn test_init_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("data").join("resumes.json");
        ResumeStore::open(&path).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (store, _temp) = create_test_store().await;
        store.save(12345, "Rust engineer, 5 years").await.unwrap();
        assert_eq!(store.load(12345).await.unwrap(), "Rust engineer, 5 years");
    }

    #[tokio::test]
    async fn test_missing_user_is_empty() {
        let (store, _temp) = create_test_store().await;
        store.save(1, "someone else").await.unwrap();
        assert_eq!(store.load(2).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let (store, _temp) = create_test_store().await;
        store.save(7, "first draft").await.unwrap();
        store.save(7, "second draft").await.unwrap();
        assert_eq!(store.load(7).await.unwrap(), "second draft");
    }

    #[tokio::test]
    async fn test_keys_are_decimal_user_ids() {
        let (store, _temp) = create_test_store().await;
        store.save(-100200, "group admin").await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["-100200"], "group admin");
    }

    #[tokio::test]
    async fn test_zero_length_file_is_empty_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("resumes.json");
        std::fs::write(&path, "").unwrap();

        let store = ResumeStore::open(&path).await.unwrap();
        assert_eq!(store.load(1).await.unwrap(), "");
        store.save(1, "text").await.unwrap();
        assert_eq!(store.load(1).await.unwrap(), "text");
    }

    #[tokio::test]
    async fn test_corrupt_document_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("resumes.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = ResumeStore::open(&path).await.unwrap();
        assert!(matches!(store.load(1).await, Err(StoreError::Json { .. })));
        assert!(matches!(store.save(1, "x").await, Err(StoreError::Json { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_saves_keep_every_user() {
        let (store, _temp) = create_test_store().await;
        let store = Arc::new(store);

        let tasks: Vec<_> = (0..32)
            .map(|user_id| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store.save(user_id, &format!("resume {}", user_id)).await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        for user_id in 0..32 {
            assert_eq!(store.load(user_id).await.unwrap(), format!("resume {}", user_id));
        }
    }
}
