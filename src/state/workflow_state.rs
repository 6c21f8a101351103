//! Workflow state handle passed between orchestrator steps.

use crate::core::{Error, Result};
use crate::state::backend::{StateBackend, StateSnapshot};
use crate::state::backends::MemoryBackend;
use std::sync::Arc;
use tracing::info;

/// Well-known state keys.
pub mod keys {
    /// Resolved schema identifier
    pub const SCHEMA_ID: &str = "schema_id";
    /// Resolved credential definition identifier
    pub const CRED_DEF_ID: &str = "cred_def_id";
    /// Issuer public DID used during provisioning
    pub const ISSUER_DID: &str = "issuer_did";

    /// Key under which the connection id for an alias is stored.
    pub fn connection(alias: &str) -> String {
        format!("connection_id:{}", alias)
    }
}

/// Explicit workflow state, cheap to clone.
///
/// Every orchestrator step reads its preconditions from here and records
/// what it resolved, so a rerun of the workflow can pick up where a
/// crashed run stopped.
#[derive(Clone)]
pub struct WorkflowState {
    backend: Arc<dyn StateBackend>,
}

impl WorkflowState {
    /// Wrap a backend.
    pub fn new(backend: Arc<dyn StateBackend>) -> Self {
        Self { backend }
    }

    /// Fresh in-memory state.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// The underlying backend.
    pub fn backend(&self) -> &Arc<dyn StateBackend> {
        &self.backend
    }

    /// Read a key.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        self.backend.get(key).await
    }

    /// Read a key that an earlier step must have written.
    pub async fn require(&self, key: &str) -> Result<String> {
        self.get(key)
            .await?
            .ok_or_else(|| Error::Precondition(format!("'{}' not found in workflow state", key)))
    }

    /// Upsert a key.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.backend.put(key, value).await?;
        info!(key, "state saved");
        Ok(())
    }

    /// Whole document.
    pub async fn snapshot(&self) -> Result<StateSnapshot> {
        self.backend.load().await
    }

    /// Out-of-band reset.
    pub async fn reset(&self) -> Result<()> {
        self.backend.clear().await
    }

    pub async fn schema_id(&self) -> Result<Option<String>> {
        self.get(keys::SCHEMA_ID).await
    }

    pub async fn cred_def_id(&self) -> Result<Option<String>> {
        self.get(keys::CRED_DEF_ID).await
    }

    /// Connection id recorded for an alias.
    pub async fn connection_id(&self, alias: &str) -> Result<Option<String>> {
        self.get(&keys::connection(alias)).await
    }
}

impl std::fmt::Debug for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowState")
            .field("backend", &self.backend.backend_type())
            .finish()
    }
}
