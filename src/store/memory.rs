//! In-memory store backends.
//!
//! Used by tests and the CLI's dry-run mode. Transactions are serialized by
//! the map lock, which is enough to make concurrent bucket increments safe.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::store::{merge_fields, DocumentStore, ObjectStore, TransactFn};

/// In-memory document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents, for test assertions.
    pub fn len(&self) -> usize {
        self.documents.lock().expect("store lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        Ok(self.documents.lock().expect("store lock").get(path).cloned())
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        self.documents
            .lock()
            .expect("store lock")
            .insert(path.to_string(), value);
        Ok(())
    }

    async fn merge(&self, path: &str, patch: Value) -> Result<()> {
        let mut documents = self.documents.lock().expect("store lock");
        let existing = documents.get(path).cloned();
        documents.insert(path.to_string(), merge_fields(existing, patch));
        Ok(())
    }

    async fn transact(&self, path: &str, apply: TransactFn) -> Result<Value> {
        let mut documents = self.documents.lock().expect("store lock");
        let next = apply(documents.get(path))?;
        documents.insert(path.to_string(), next.clone());
        Ok(next)
    }
}

/// In-memory image store.
#[derive(Debug, Default)]
pub struct MemoryObjects {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryObjects {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    async fn put_image(&self, path: &str, bytes: Vec<u8>) -> Result<String> {
        self.blobs
            .lock()
            .expect("blob lock")
            .insert(path.to_string(), bytes);
        Ok(format!("memory://{path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryStore::new();
        store.set("a/b", json!({"x": 1})).await.unwrap();
        assert_eq!(store.get("a/b").await.unwrap(), Some(json!({"x": 1})));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_merge_preserves_other_fields() {
        let store = MemoryStore::new();
        store.set("doc", json!({"keep": true, "n": 1})).await.unwrap();
        store.merge("doc", json!({"n": 2})).await.unwrap();
        assert_eq!(
            store.get("doc").await.unwrap(),
            Some(json!({"keep": true, "n": 2}))
        );
    }

    #[tokio::test]
    async fn test_transact_applies_and_returns() {
        let store = MemoryStore::new();
        let written = store
            .transact(
                "counter",
                Box::new(|current| {
                    let count = current
                        .and_then(|v| v["count"].as_i64())
                        .unwrap_or(0);
                    Ok(json!({"count": count + 1}))
                }),
            )
            .await
            .unwrap();
        assert_eq!(written, json!({"count": 1}));
    }

    #[tokio::test]
    async fn test_transact_error_aborts_write() {
        let store = MemoryStore::new();
        store.set("doc", json!({"count": 5})).await.unwrap();
        let result = store
            .transact(
                "doc",
                Box::new(|_| Err(AppError::resource_exhausted("full"))),
            )
            .await;
        assert!(result.is_err());
        assert_eq!(store.get("doc").await.unwrap(), Some(json!({"count": 5})));
    }

    #[tokio::test]
    async fn test_put_image_returns_url() {
        let objects = MemoryObjects::new();
        let url = objects.put_image("a/b.png", vec![1, 2, 3]).await.unwrap();
        assert_eq!(url, "memory://a/b.png");
    }
}
