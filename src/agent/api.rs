//! AgentApi trait definition.
//!
//! One method per admin endpoint the orchestrators need. Implementations
//! classify every failure as a network, agent or protocol fault and never
//! retry on their own.

use crate::agent::types::*;
use crate::core::{AgentRole, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Typed facade over one agent's admin API.
#[async_trait]
pub trait AgentApi: Send + Sync {
    /// Which party this agent plays.
    fn role(&self) -> AgentRole;

    /// Public DID of the agent's wallet, if one is configured.
    async fn public_did(&self) -> Result<Option<String>>;

    // Connections

    /// Connections filtered by alias and, optionally, state.
    async fn connections(&self, alias: &str, state: Option<&str>) -> Result<Vec<ConnectionRecord>>;

    async fn create_invitation(&self, request: &InvitationRequest) -> Result<InvitationRecord>;

    async fn receive_invitation(
        &self,
        invitation: &serde_json::Value,
        alias: &str,
    ) -> Result<OobRecord>;

    // Schemas and credential definitions

    /// Create a schema and return its id.
    async fn create_schema(&self, request: &SchemaRequest) -> Result<String>;

    /// Schema ids matching issuer, name and version.
    async fn find_schemas(&self, issuer_id: &str, name: &str, version: &str) -> Result<Vec<String>>;

    /// Fetch a schema by id.
    async fn get_schema(&self, schema_id: &str) -> Result<serde_json::Value>;

    /// Create a credential definition and return its id.
    async fn create_credential_definition(&self, request: &CredDefRequest) -> Result<String>;

    /// Credential definition ids for a schema.
    async fn find_credential_definitions(&self, schema_id: &str) -> Result<Vec<String>>;

    /// Fetch a credential definition by id.
    async fn get_credential_definition(&self, cred_def_id: &str) -> Result<serde_json::Value>;

    // Credential exchange

    async fn send_offer(&self, offer: &OfferRequest) -> Result<CredExRecord>;

    /// Exchange records, oldest first, optionally filtered by state.
    async fn credential_exchanges(&self, state: Option<&CredExState>) -> Result<Vec<CredExRecord>>;

    async fn credential_exchange(&self, cred_ex_id: &str) -> Result<CredExRecord>;

    async fn send_request(&self, cred_ex_id: &str) -> Result<CredExRecord>;

    async fn issue_credential(&self, cred_ex_id: &str, comment: &str) -> Result<CredExRecord>;

    async fn store_credential(&self, cred_ex_id: &str, credential_id: &str) -> Result<CredExRecord>;

    async fn delete_credential_exchange(&self, cred_ex_id: &str) -> Result<()>;

    // Presentation exchange

    async fn send_proof_request(&self, request: &ProofRequest) -> Result<PresExRecord>;

    async fn presentation_exchange(&self, pres_ex_id: &str) -> Result<PresExRecord>;

    async fn verify_presentation(&self, pres_ex_id: &str) -> Result<VerificationResult>;

    // Wallet and revocation

    /// Credentials stored in the wallet.
    async fn credentials(&self) -> Result<Vec<StoredCredential>>;

    async fn delete_credential(&self, referent: &str) -> Result<()>;

    /// Revoke a credential; success is any 2xx.
    async fn revoke(&self, request: &RevokeRequest) -> Result<()>;

    /// Revocation registry ids created for a credential definition.
    async fn revocation_registries(&self, cred_def_id: &str) -> Result<Vec<String>>;
}

/// The three agents of one workflow.
#[derive(Clone)]
pub struct AgentSet {
    pub issuer: Arc<dyn AgentApi>,
    pub holder: Arc<dyn AgentApi>,
    pub verifier: Arc<dyn AgentApi>,
}

impl AgentSet {
    pub fn new(
        issuer: Arc<dyn AgentApi>,
        holder: Arc<dyn AgentApi>,
        verifier: Arc<dyn AgentApi>,
    ) -> Self {
        Self {
            issuer,
            holder,
            verifier,
        }
    }
}
