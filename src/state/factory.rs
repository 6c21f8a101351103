//! Backend factory.
//!
//! Creates state backends based on configuration.

use crate::core::Result;
use crate::state::backend::{BackendType, StateBackend};
use crate::state::backends::{FileBackend, MemoryBackend};
use crate::state::config::StateConfig;
use std::sync::Arc;

/// Create a state backend from configuration.
///
/// Returns an Arc-wrapped backend for shared ownership.
pub fn create_state_backend(config: &StateConfig) -> Result<Arc<dyn StateBackend>> {
    match config.backend {
        BackendType::File => {
            let backend = FileBackend::new(config.file_path())?;
            Ok(Arc::new(backend) as Arc<dyn StateBackend>)
        }
        BackendType::Memory => Ok(Arc::new(MemoryBackend::new()) as Arc<dyn StateBackend>),
    }
}
