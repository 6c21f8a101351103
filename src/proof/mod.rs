//! Proof Orchestrator
//!
//! Proof request → presentation → verification between verifier and
//! holder:
//! - Presentation request with a non-revocation interval
//! - Pluggable source of record updates (polling by default)
//! - Strict classification into granted, denied, timeout or vanished

pub mod orchestrator;
pub mod request;
pub mod source;
pub mod state;

pub use orchestrator::{ProofOrchestrator, ProofOutcome, ProofReport};
pub use request::PresentationRequestSpec;
pub use source::{PollingSource, PresentationSource, SourceEvent};
pub use state::PresentationStep;
