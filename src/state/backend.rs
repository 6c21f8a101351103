//! StateBackend trait definition.
//!
//! Core trait that all workflow state stores must implement.

use crate::core::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A full copy of the persisted key/value document.
pub type StateSnapshot = BTreeMap<String, String>;

/// Backend type identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Flat JSON document on disk
    File,
    /// Process-local map, lost on exit
    Memory,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::File => write!(f, "file"),
            BackendType::Memory => write!(f, "memory"),
        }
    }
}

/// Core trait for workflow state stores.
///
/// Implementations persist a flat string map. Writes are single-key
/// upserts; a backend must serialise its own read-modify-write cycle so
/// concurrent writers in one process do not lose updates.
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Read the whole document. A missing document is an empty map.
    async fn load(&self) -> Result<StateSnapshot>;

    /// Read a single key.
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load().await?.get(key).cloned())
    }

    /// Insert or overwrite a single key.
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Drop every key.
    async fn clear(&self) -> Result<()>;

    /// Get the backend type.
    fn backend_type(&self) -> BackendType;
}
