//! Filesystem Object Store
//!
//! Maps object keys onto files below a root directory. Listing walks the
//! deepest directory named by the prefix with `walkdir` on the blocking pool
//! and pages through keys in lexical order, using the last returned key as
//! the cursor.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use walkdir::WalkDir;

use super::store::{validate_key, ListPage, ObjectInfo, ObjectStore, StoreError, StoreResult};

/// Object store rooted at a local directory
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Create the store, creating `root` if it does not exist
    pub fn new(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, segment| path.join(segment)))
    }
}

/// Directory holding every key that starts with `prefix`: its complete
/// `/`-separated segments below `root`
fn walk_start(root: &Path, prefix: &str) -> PathBuf {
    let dir = match prefix.rfind('/') {
        Some(end) => &prefix[..end],
        None => return root.to_path_buf(),
    };
    let segments: Vec<&str> = dir.split('/').collect();
    if segments.iter().any(|s| s.is_empty() || *s == "." || *s == "..") {
        return root.to_path_buf();
    }
    segments.iter().fold(root.to_path_buf(), |path, segment| path.join(segment))
}

/// Collect the `/`-joined keys of files under `start`, relative to `root`, sorted
fn scan_keys(root: &Path, start: &Path) -> StoreResult<Vec<ObjectInfo>> {
    let mut objects = Vec::new();
    if !start.is_dir() {
        return Ok(objects);
    }

    for entry in WalkDir::new(start).follow_links(false) {
        let entry = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = match entry.path().strip_prefix(root) {
            Ok(p) => p,
            Err(_) => continue,
        };
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        // In-flight uploads are written next to their target first
        if key.ends_with(".partial") {
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        objects.push(ObjectInfo { key, size });
    }

    objects.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(objects)
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn list(&self, prefix: &str, cursor: Option<&str>, limit: usize) -> StoreResult<ListPage> {
        let root = self.root.clone();
        let start = walk_start(&root, prefix);
        let all = tokio::task::spawn_blocking(move || scan_keys(&root, &start))
            .await
            .map_err(|e| StoreError::Backend(format!("listing task failed: {e}")))??;

        let page: Vec<ObjectInfo> = all
            .into_iter()
            .filter(|o| o.key.starts_with(prefix))
            .filter(|o| cursor.map_or(true, |c| o.key.as_str() > c))
            .take(limit)
            .collect();

        let cursor = if limit > 0 && page.len() == limit {
            page.last().map(|o| o.key.clone())
        } else {
            None
        };

        Ok(ListPage { objects: page, cursor })
    }

    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut partial = path.clone().into_os_string();
        partial.push(".partial");
        let partial = PathBuf::from(partial);

        tokio::fs::write(&partial, &data).await?;
        tokio::fs::rename(&partial, &path).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}
