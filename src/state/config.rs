//! State store configuration.
//!
//! Configuration-driven backend selection.

use crate::state::backend::BackendType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default location of the state document.
pub const DEFAULT_STATE_FILE: &str = "system_state.json";

/// State store configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateConfig {
    /// Backend type to use
    pub backend: BackendType,
    /// Document path (file backend only)
    pub path: Option<PathBuf>,
}

impl StateConfig {
    /// File backend at the given path.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendType::File,
            path: Some(path.into()),
        }
    }

    /// In-memory backend.
    pub fn memory() -> Self {
        Self {
            backend: BackendType::Memory,
            path: None,
        }
    }

    /// Path for the file backend, falling back to the default file name.
    pub fn file_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE))
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self::file(DEFAULT_STATE_FILE)
    }
}
