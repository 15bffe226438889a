//! JSON-file backed storage.
//!
//! The whole store is one JSON object on disk. Every mutation rewrites the
//! file through a temporary file in the same directory followed by a rename,
//! so a crash mid-write leaves the previous contents intact.

// ============================================================================
// Imports
// ============================================================================

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};

use super::Storage;

// ============================================================================
// FileStorage
// ============================================================================

/// [`Storage`] persisted as a single JSON object file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: Mutex<FxHashMap<String, Value>>,
    /// Serializes file rewrites so a slower, older snapshot never lands last.
    write_lock: tokio::sync::Mutex<()>,
}

impl FileStorage {
    /// Opens the store at `path`, loading existing contents.
    ///
    /// A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the file exists but cannot be read
    /// - [`Error::Json`] if it is not valid JSON
    /// - [`Error::Storage`] if the top-level value is not an object
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let values = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes)? {
                Value::Object(map) => map.into_iter().collect(),
                _ => {
                    return Err(Error::storage(
                        path.display().to_string(),
                        "top-level value is not an object",
                    ));
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FxHashMap::default(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), keys = values.len(), "FileStorage opened");

        Ok(Self {
            path,
            values: Mutex::new(values),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Returns the backing file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes the current contents and atomically replaces the file.
    async fn persist(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let bytes = {
            let values = self.values.lock();
            let object: Map<String, Value> = values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            serde_json::to_vec(&Value::Object(object))?
        };

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| Error::storage(self.path.display().to_string(), e.to_string()))?
    }
}

/// Writes `bytes` to a sibling temp file and renames it over `path`.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| Error::storage(path.display().to_string(), e.to_string()))?;
    Ok(())
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values.lock().insert(key.to_string(), value);
        self.persist().await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let removed = self.values.lock().remove(key).is_some();
        if removed {
            self.persist().await?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
