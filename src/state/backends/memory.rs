//! In-memory backend implementation.

use crate::core::Result;
use crate::state::backend::{BackendType, StateBackend, StateSnapshot};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Process-local state store.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<StateSnapshot>,
}

impl MemoryBackend {
    /// Create an empty memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory backend pre-populated with entries.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl StateBackend for MemoryBackend {
    async fn load(&self) -> Result<StateSnapshot> {
        Ok(self.entries.read().await.clone())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Memory
    }
}
