//! Object Store
//!
//! Key-addressed blob storage with cursor-based listing. Keys are
//! `/`-separated relative paths such as `audio/film-1/ep-1/0001.mp3`.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

/// Error type for object store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
}

/// One page of a listing. `cursor` is `None` once the listing is exhausted.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectInfo>,
    pub cursor: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List objects whose key starts with `prefix`, in lexical key order,
    /// strictly after `cursor` when one is given.
    async fn list(&self, prefix: &str, cursor: Option<&str>, limit: usize) -> StoreResult<ListPage>;

    async fn get(&self, key: &str) -> StoreResult<Bytes>;

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StoreResult<()>;

    /// Deleting a missing key is not an error
    async fn delete(&self, key: &str) -> StoreResult<()>;

    async fn exists(&self, key: &str) -> StoreResult<bool>;
}

/// Reject keys that could escape the store root or are not normalized
pub fn validate_key(key: &str) -> StoreResult<()> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.contains('\0')
        || key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if invalid {
        Err(StoreError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

/// Object store held entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content type recorded at upload time
    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.objects.read().await.get(key).map(|o| o.content_type.clone())
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list(&self, prefix: &str, cursor: Option<&str>, limit: usize) -> StoreResult<ListPage> {
        let objects = self.objects.read().await;

        let lower = match cursor {
            Some(c) => Bound::Excluded(c.to_string()),
            None => Bound::Included(prefix.to_string()),
        };

        let page: Vec<ObjectInfo> = objects
            .range((lower, Bound::Unbounded))
            .skip_while(|(key, _)| key.as_str() < prefix)
            .take_while(|(key, _)| key.starts_with(prefix))
            .take(limit)
            .map(|(key, object)| ObjectInfo {
                key: key.clone(),
                size: object.data.len() as u64,
            })
            .collect();

        let cursor = if limit > 0 && page.len() == limit {
            page.last().map(|o| o.key.clone())
        } else {
            None
        };

        Ok(ListPage { objects: page, cursor })
    }

    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StoreResult<()> {
        validate_key(key)?;
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.objects.read().await.contains_key(key))
    }
}
