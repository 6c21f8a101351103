//! # credflow - Credential Lifecycle Orchestration
//!
//! Drives a three-party verifiable-credential lifecycle (issuer, holder,
//! verifier) through the agents' admin HTTP APIs:
//! - **Provisioning**: schema and revocable credential definition
//! - **Issuance**: offer, request, issue, store, with stall reconciliation
//! - **Proof**: presentation request with a non-revocation interval
//! - **Revocation**: published revocation of a selected credential
//!
//! The agents own all cryptography and ledger access; this crate sequences
//! the steps, retries transient faults and keeps workflow state.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use credflow::issuance::CredentialAttributes;
//! use credflow::workflow::{Workflow, WorkflowConfig};
//!
//! #[tokio::main]
//! async fn main() -> credflow::Result<()> {
//!     let workflow = Workflow::from_config(WorkflowConfig::default())?;
//!     let attributes =
//!         CredentialAttributes::new("humano-anoncreds-v2", "100.0", "did:sov:abc123")?;
//!
//!     let summary = workflow.run_all(&attributes, false).await?;
//!     println!("Proof: {}", summary.proof.outcome);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod connection;
pub mod core;
pub mod issuance;
pub mod proof;
pub mod provision;
pub mod retry;
pub mod revocation;
pub mod state;
pub mod workflow;

pub use core::error::{Error, Result};
