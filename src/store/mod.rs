//! Storage abstractions for documents and generated images.
//!
//! The document store is a path-keyed JSON document database with three
//! write modes:
//! - `set`: wholesale overwrite (quiz definitions, packages, articles)
//! - `merge`: shallow field merge that never clobbers unnamed fields
//!   (reconciler write-backs)
//! - `transact`: atomic read-modify-write of a single document (rate
//!   limiter buckets)
//!
//! ## Path hierarchy
//!
//! ```text
//! groups/{group}                        # group doc
//! groups/{group}/members/{uid}          # membership marker
//! groups/{group}/weeks/{week}/quiz/definition
//! year_news/{year}                      # year package
//! year_news/{year}/stories/{story_key}  # articles
//! rate_limits/{uid}_{action}_{window}   # limiter buckets
//! ```

pub mod local;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

// Re-export for convenience
pub use local::{LocalObjects, LocalStore};
pub use memory::{MemoryObjects, MemoryStore};

/// Closure applied inside a document transaction.
///
/// Receives the current document (if any) and returns the value to write;
/// an error aborts the transaction without writing.
pub type TransactFn = Box<dyn FnOnce(Option<&Value>) -> Result<Value> + Send>;

/// Path-keyed JSON document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document, `None` when absent.
    async fn get(&self, path: &str) -> Result<Option<Value>>;

    /// Overwrite a document wholesale.
    async fn set(&self, path: &str, value: Value) -> Result<()>;

    /// Shallow-merge top-level fields into a document, creating it if
    /// absent. Fields not named in `patch` are left untouched.
    async fn merge(&self, path: &str, patch: Value) -> Result<()>;

    /// Atomic read-modify-write of one document. Returns the written value.
    async fn transact(&self, path: &str, apply: TransactFn) -> Result<Value>;
}

/// Blob store for generated images.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store image bytes under `path` and return a long-lived readable URL.
    async fn put_image(&self, path: &str, bytes: Vec<u8>) -> Result<String>;
}

/// Shallow merge of `patch` onto `existing`, used by both backends.
pub(crate) fn merge_fields(existing: Option<Value>, patch: Value) -> Value {
    match (existing, patch) {
        (Some(Value::Object(mut base)), Value::Object(overlay)) => {
            for (key, value) in overlay {
                base.insert(key, value);
            }
            Value::Object(base)
        }
        (_, patch) => patch,
    }
}

/// Document path helpers.
pub mod paths {
    /// Group document.
    pub fn group(group_id: &str) -> String {
        format!("groups/{group_id}")
    }

    /// Membership marker document.
    pub fn member(group_id: &str, uid: &str) -> String {
        format!("groups/{group_id}/members/{uid}")
    }

    /// Weekly quiz definition.
    pub fn quiz_definition(group_id: &str, week_id: &str) -> String {
        format!("groups/{group_id}/weeks/{week_id}/quiz/definition")
    }

    /// Year-news package.
    pub fn year_package(year: i32) -> String {
        format!("year_news/{year}")
    }

    /// Generated article under its year.
    pub fn article(year: i32, story_key: &str) -> String {
        format!("year_news/{year}/stories/{story_key}")
    }

    /// Rate limiter bucket.
    pub fn rate_bucket(uid: &str, action: &str, window: i64) -> String {
        format!("rate_limits/{uid}_{action}_{window}")
    }
}
