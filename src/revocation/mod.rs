//! Revocation Orchestrator
//!
//! Issuer-side revocation of a holder credential, published to the ledger
//! without notifying the holder.

pub mod orchestrator;

pub use orchestrator::{
    CredentialSelector, RevocationOrchestrator, RevocationOutcome, RevocationTarget,
};
