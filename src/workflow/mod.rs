//! Workflow Runner
//!
//! Sequences the lifecycle steps against one configuration:
//! - Connections, provisioning, issuance, proof, revocation
//! - JSON configuration with per-section defaults

pub mod config;
pub mod runner;

pub use config::{ConnectionAliases, WorkflowConfig};
pub use runner::{CleanupReport, Workflow, WorkflowSummary};
