//! Filesystem-backed result store
//!
//! One pretty-printed UTF-8 JSON file per job key, at `<root>/<key>.json`.
//! The key already embeds its `dataset/category/...` hierarchy, so the slash
//! segments become directories under the cache root.

use crate::store::{ResultStore, StoreError, StoreResult};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Result store that persists each entry as a JSON file
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Creates a store rooted at the given cache directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a job key to its file path under the cache root
    fn entry_path(&self, key: &str) -> StoreResult<PathBuf> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey("empty key".to_string()));
        }
        // Keys are relative paths by construction; refuse anything that
        // could escape the cache root.
        if key.starts_with('/') || key.split('/').any(|seg| seg == "..") {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

impl ResultStore for FsStore {
    fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let path = self.entry_path(key)?;
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        let value: Value = serde_json::from_str(&content)?;
        tracing::debug!(key, size = content.len(), "cache hit");
        Ok(Some(value))
    }

    fn put(&self, key: &str, value: &Value) -> StoreResult<()> {
        let path = self.entry_path(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut content = serde_json::to_string_pretty(value)?;
        content.push('\n');
        std::fs::write(&path, content.as_bytes())?;
        tracing::debug!(key, size = content.len(), "cache store");
        Ok(())
    }
}
