//! Durable Workflow State
//!
//! Trait-based key/value store for workflow artifacts:
//! - File (flat JSON document)
//! - Memory
//!
//! Orchestrators receive a [`WorkflowState`] handle rather than touching
//! a global file.

pub mod backend;
pub mod backends;
pub mod config;
pub mod factory;
pub mod workflow_state;

pub use backend::{BackendType, StateBackend, StateSnapshot};
pub use config::StateConfig;
pub use factory::create_state_backend;
pub use workflow_state::{keys, WorkflowState};
