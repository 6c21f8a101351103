//! Credential Issuance Orchestrator
//!
//! Offer → request → issue → store between issuer and holder:
//! - Validated personhood attributes
//! - Holder-side transition table
//! - Polling orchestrator that reconciles a stalled handshake

pub mod attributes;
pub mod orchestrator;
pub mod state;

pub use attributes::{generate_controller_did, CredentialAttributes, CredentialOffer};
pub use orchestrator::{IssuanceOrchestrator, IssuanceOutcome, IssuanceReport};
pub use state::HolderAction;
