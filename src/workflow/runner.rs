//! End-to-end workflow steps.

use crate::agent::{AgentClient, AgentSet};
use crate::connection::{ConnectionEstablisher, ConnectionRef};
use crate::core::{Error, Result};
use crate::issuance::{CredentialAttributes, IssuanceOrchestrator, IssuanceOutcome, IssuanceReport};
use crate::proof::{ProofOrchestrator, ProofReport};
use crate::provision::{ProvisionedIds, Provisioner};
use crate::revocation::{CredentialSelector, RevocationOrchestrator, RevocationOutcome};
use crate::state::{create_state_backend, keys, WorkflowState};
use crate::workflow::config::WorkflowConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// What a `run_all` pass produced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub issuer_connection: ConnectionRef,
    pub verifier_connection: ConnectionRef,
    pub provisioned: ProvisionedIds,
    pub issuance: IssuanceReport,
    pub proof: ProofReport,
    pub revocation: Option<RevocationOutcome>,
    /// Proof repeated after revocation
    pub proof_after_revocation: Option<ProofReport>,
}

/// What a cleanup pass removed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub credentials_deleted: usize,
    pub exchanges_deleted: usize,
    /// Deletes the agents refused
    pub failures: usize,
}

/// The three agents, the workflow state and the configuration that ties
/// the steps together.
pub struct Workflow {
    config: WorkflowConfig,
    agents: AgentSet,
    state: WorkflowState,
}

impl Workflow {
    pub fn new(config: WorkflowConfig, agents: AgentSet, state: WorkflowState) -> Self {
        Self {
            config,
            agents,
            state,
        }
    }

    /// HTTP clients and state backend from configuration.
    pub fn from_config(config: WorkflowConfig) -> Result<Self> {
        config.validate()?;
        let agents = AgentSet::new(
            Arc::new(AgentClient::new(config.agents.issuer.clone())?),
            Arc::new(AgentClient::new(config.agents.holder.clone())?),
            Arc::new(AgentClient::new(config.agents.verifier.clone())?),
        );
        let state = WorkflowState::new(create_state_backend(&config.state)?);
        Ok(Self::new(config, agents, state))
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Connect issuer and verifier to the holder.
    pub async fn establish_connections(&self) -> Result<(ConnectionRef, ConnectionRef)> {
        let establisher =
            ConnectionEstablisher::new(self.state.clone(), self.config.connection_poll.clone());
        let aliases = &self.config.aliases;

        let issuer = establisher
            .connect(
                self.agents.issuer.as_ref(),
                self.agents.holder.as_ref(),
                &aliases.issuer_holder,
            )
            .await?;
        let verifier = establisher
            .connect(
                self.agents.verifier.as_ref(),
                self.agents.holder.as_ref(),
                &aliases.verifier_holder,
            )
            .await?;
        Ok((issuer, verifier))
    }

    /// Publish schema and credential definition, unless the ids already
    /// in the state still resolve on the issuer.
    pub async fn provision_issuer(&self) -> Result<ProvisionedIds> {
        if let Some(ids) = self.already_provisioned().await? {
            info!(cred_def_id = %ids.cred_def_id, "issuer already provisioned");
            return Ok(ids);
        }
        Provisioner::new(
            self.agents.issuer.clone(),
            self.state.clone(),
            self.config.retry.clone(),
        )
        .provision_issuer(&self.config.schema, &self.config.cred_def)
        .await
    }

    async fn already_provisioned(&self) -> Result<Option<ProvisionedIds>> {
        let (Some(schema_id), Some(cred_def_id), Some(issuer_did)) = (
            self.state.schema_id().await?,
            self.state.cred_def_id().await?,
            self.state.get(keys::ISSUER_DID).await?,
        ) else {
            return Ok(None);
        };

        let issuer = &self.agents.issuer;
        let resolves = still_published(issuer.get_schema(&schema_id).await)?
            && still_published(issuer.get_credential_definition(&cred_def_id).await)?;
        if !resolves {
            warn!(schema_id = %schema_id, "persisted ledger ids no longer resolve, provisioning again");
            return Ok(None);
        }
        Ok(Some(ProvisionedIds {
            issuer_did,
            schema_id,
            cred_def_id,
        }))
    }

    /// Offer `attributes` to the holder and drive the handshake.
    pub async fn issue_credential(&self, attributes: &CredentialAttributes) -> Result<IssuanceReport> {
        IssuanceOrchestrator::new(
            self.agents.clone(),
            self.state.clone(),
            self.config.retry.clone(),
            self.config.issuance_poll.clone(),
        )
        .issue(&self.config.aliases.issuer_holder.inviter_alias, attributes)
        .await
    }

    /// Ask the holder for a personhood proof.
    pub async fn request_proof(&self) -> Result<ProofReport> {
        ProofOrchestrator::new(self.agents.verifier.clone(), self.state.clone())
            .with_request(self.config.proof_request.clone())
            .request_proof(
                &self.config.aliases.verifier_holder.inviter_alias,
                &self.config.proof_poll,
            )
            .await
    }

    /// Revoke the selected holder credential.
    pub async fn revoke_credential(&self, selector: &CredentialSelector) -> Result<RevocationOutcome> {
        RevocationOrchestrator::new(self.agents.issuer.clone(), self.agents.holder.clone())
            .revoke(selector)
            .await
    }

    /// Revocation registries of the provisioned credential definition.
    pub async fn revocation_registries(&self) -> Result<Vec<String>> {
        let cred_def_id = self.state.require(keys::CRED_DEF_ID).await?;
        RevocationOrchestrator::new(self.agents.issuer.clone(), self.agents.holder.clone())
            .list_revocation_registries(&cred_def_id)
            .await
    }

    /// Delete every holder credential and every credential exchange record
    /// on the issuer and holder. Refused deletes are logged and counted.
    pub async fn clean_agents(&self) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();

        for credential in self.agents.holder.credentials().await? {
            match self.agents.holder.delete_credential(&credential.referent).await {
                Ok(()) => report.credentials_deleted += 1,
                Err(e) => {
                    warn!(referent = %credential.referent, error = %e, "credential not deleted");
                    report.failures += 1;
                }
            }
        }

        for agent in [&self.agents.issuer, &self.agents.holder] {
            for record in agent.credential_exchanges(None).await? {
                match agent.delete_credential_exchange(&record.cred_ex_id).await {
                    Ok(()) => report.exchanges_deleted += 1,
                    Err(e) => {
                        warn!(role = %agent.role(), cred_ex_id = %record.cred_ex_id, error = %e, "exchange record not deleted");
                        report.failures += 1;
                    }
                }
            }
        }

        info!(
            credentials = report.credentials_deleted,
            exchanges = report.exchanges_deleted,
            failures = report.failures,
            "agents cleaned"
        );
        Ok(report)
    }

    /// Every step in order. With `revoke`, the issued credential is
    /// revoked and the proof repeated.
    pub async fn run_all(&self, attributes: &CredentialAttributes, revoke: bool) -> Result<WorkflowSummary> {
        attributes.validate()?;

        let (issuer_connection, verifier_connection) = self.establish_connections().await?;
        let provisioned = self.provision_issuer().await?;

        let issuance = self.issue_credential(attributes).await?;
        if issuance.outcome == IssuanceOutcome::TimedOut {
            return Err(Error::Timeout {
                what: format!("credential exchange {}", issuance.cred_ex_id),
                polls: self.config.issuance_poll.max_polls,
            });
        }

        let proof = self.request_proof().await?;

        let (revocation, proof_after_revocation) = if revoke {
            let selector = CredentialSelector::CredDefId(provisioned.cred_def_id.clone());
            let outcome = self.revoke_credential(&selector).await?;
            let again = if outcome.is_revoked() {
                Some(self.request_proof().await?)
            } else {
                None
            };
            (Some(outcome), again)
        } else {
            (None, None)
        };

        Ok(WorkflowSummary {
            issuer_connection,
            verifier_connection,
            provisioned,
            issuance,
            proof,
            revocation,
            proof_after_revocation,
        })
    }
}

/// Only a 404 means the ledger object is gone.
fn still_published(lookup: Result<serde_json::Value>) -> Result<bool> {
    match lookup {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}
