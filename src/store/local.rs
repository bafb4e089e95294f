//! Local filesystem store backends.
//!
//! Documents are JSON files under a root directory, one file per document
//! path. Writes are atomic (write to temp, then rename). Transactions are
//! serialized process-wide by a tokio mutex; this backend targets local
//! development, not multi-process deployments.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::store::{merge_fields, DocumentStore, ObjectStore, TransactFn};

/// Local filesystem document store.
pub struct LocalStore {
    root_dir: PathBuf,
    transact_lock: Mutex<()>,
}

impl LocalStore {
    /// Create a new store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            transact_lock: Mutex::new(()),
        }
    }

    /// File path for a document path.
    fn file_path(&self, path: &str) -> PathBuf {
        self.root_dir.join(format!("{path}.json"))
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &PathBuf, bytes: &[u8]) -> Result<()> {
        self.ensure_dir(path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read_value(&self, path: &str) -> Result<Option<Value>> {
        match tokio::fs::read(self.file_path(path)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn write_value(&self, path: &str, value: &Value) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(&self.file_path(path), &bytes).await
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        self.read_value(path).await
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        self.write_value(path, &value).await
    }

    async fn merge(&self, path: &str, patch: Value) -> Result<()> {
        let _guard = self.transact_lock.lock().await;
        let existing = self.read_value(path).await?;
        self.write_value(path, &merge_fields(existing, patch)).await
    }

    async fn transact(&self, path: &str, apply: TransactFn) -> Result<Value> {
        let _guard = self.transact_lock.lock().await;
        let current = self.read_value(path).await?;
        let next = apply(current.as_ref())?;
        self.write_value(path, &next).await?;
        Ok(next)
    }
}

/// Local filesystem image store.
pub struct LocalObjects {
    root_dir: PathBuf,
}

impl LocalObjects {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjects {
    async fn put_image(&self, path: &str, bytes: Vec<u8>) -> Result<String> {
        let file_path = self.root_dir.join(path);
        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&file_path, &bytes).await?;
        Ok(format!("file://{}", file_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        store
            .set("groups/g1/members/u1", json!({"joined": true}))
            .await
            .unwrap();
        let loaded = store.get("groups/g1/members/u1").await.unwrap();
        assert_eq!(loaded, Some(json!({"joined": true})));
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        assert_eq!(store.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_merge_on_disk() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        store.set("doc", json!({"a": 1, "b": 2})).await.unwrap();
        store.merge("doc", json!({"b": 9})).await.unwrap();
        assert_eq!(
            store.get("doc").await.unwrap(),
            Some(json!({"a": 1, "b": 9}))
        );
    }

    #[tokio::test]
    async fn test_transact_increments() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        for expected in 1..=3 {
            let written = store
                .transact(
                    "counter",
                    Box::new(|current| {
                        let count = current.and_then(|v| v["count"].as_i64()).unwrap_or(0);
                        Ok(json!({"count": count + 1}))
                    }),
                )
                .await
                .unwrap();
            assert_eq!(written["count"], expected);
        }
    }

    #[tokio::test]
    async fn test_put_image_writes_file() {
        let tmp = TempDir::new().unwrap();
        let objects = LocalObjects::new(tmp.path());

        let url = objects
            .put_image("year-news/1985/hero/key.png", vec![0xFF])
            .await
            .unwrap();
        assert!(url.starts_with("file://"));
        assert!(tmp.path().join("year-news/1985/hero/key.png").exists());
    }
}
