//! File backend implementation.
//!
//! Keeps the workflow state as one pretty-printed JSON object and rewrites
//! the whole document on every upsert. A write lands in a sibling temp file
//! that is then renamed over the document, so a crash leaves either the old
//! or the new state. Safe for concurrent writers inside one process;
//! separate processes need external locking.

use crate::core::{Error, Result};
use crate::state::backend::{BackendType, StateBackend, StateSnapshot};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// JSON file backed state store.
pub struct FileBackend {
    /// Document location
    path: PathBuf,
    /// Serialises read-modify-write cycles
    lock: Mutex<()>,
}

impl FileBackend {
    /// Create a new file backend.
    ///
    /// The file itself is created lazily on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.is_dir() {
            return Err(Error::Storage(format!(
                "state path {} is a directory",
                path.display()
            )));
        }

        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Location of the state document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<StateSnapshot> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(StateSnapshot::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                Error::Storage(format!("corrupt state file {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StateSnapshot::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_document(&self, document: &StateSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(document)?;
        let staging = self.staging_path();
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateBackend for FileBackend {
    async fn load(&self) -> Result<StateSnapshot> {
        let _guard = self.lock.lock().await;
        self.read_document().await
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        document.insert(key.to_string(), value.to_string());
        self.write_document(&document).await?;
        debug!(key, path = %self.path.display(), "state key saved");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn backend_type(&self) -> BackendType {
        BackendType::File
    }
}
