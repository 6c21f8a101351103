//! Create-else-discover provisioning of schemas and credential definitions.

use crate::agent::AgentApi;
use crate::core::{Error, Result};
use crate::provision::spec::{CredDefSpec, SchemaSpec};
use crate::retry::{RetryOn, RetryPolicy};
use crate::state::{keys, WorkflowState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Identifiers resolved by a provisioning run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedIds {
    pub issuer_did: String,
    pub schema_id: String,
    pub cred_def_id: String,
}

/// Publishes the issuer's ledger objects.
///
/// Ledger writes cannot be rolled back, so every create falls back to a
/// lookup when the agent reports the object already exists. Each id is
/// written to the workflow state as soon as it is known.
pub struct Provisioner {
    issuer: Arc<dyn AgentApi>,
    state: WorkflowState,
    retry: RetryPolicy,
}

impl Provisioner {
    /// Schema creation and lookups retry transient faults under `retry`;
    /// credential definition creation is attempted once.
    pub fn new(issuer: Arc<dyn AgentApi>, state: WorkflowState, retry: RetryPolicy) -> Self {
        Self {
            issuer,
            state,
            retry: retry.retry_on(RetryOn::Transient),
        }
    }

    /// Public DID of the issuer wallet.
    pub async fn resolve_issuer_did(&self) -> Result<String> {
        match self.issuer.public_did().await? {
            Some(did) => Ok(did),
            None => Err(Error::Precondition("issuer has no public DID".into())),
        }
    }

    /// Schema id for `spec`, created or discovered.
    pub async fn ensure_schema(&self, issuer_did: &str, spec: &SchemaSpec) -> Result<String> {
        let request = spec.request(issuer_did);
        let created = self
            .retry
            .run("create_schema", || self.issuer.create_schema(&request))
            .await;

        match created {
            Ok(schema_id) => {
                info!(schema_id = %schema_id, "schema created");
                Ok(schema_id)
            }
            Err(err) if err.is_conflict() => {
                info!(name = %spec.name, version = %spec.version, "schema exists, looking it up");
                let found = self
                    .retry
                    .run("find_schemas", || {
                        self.issuer.find_schemas(issuer_did, &spec.name, &spec.version)
                    })
                    .await
                    .map_err(|e| Error::Provisioning(format!("schema lookup failed: {}", e)))?;
                found.into_iter().next().ok_or_else(|| {
                    Error::Provisioning(format!(
                        "schema {} {} reported as existing but not found",
                        spec.name, spec.version
                    ))
                })
            }
            Err(err) => Err(Error::Provisioning(format!(
                "schema creation failed: {}",
                err
            ))),
        }
    }

    /// Credential definition id over `schema_id`, created or discovered.
    ///
    /// Creation generates the revocation tails file and can take a long
    /// time; it is never retried.
    pub async fn ensure_cred_def(
        &self,
        issuer_did: &str,
        schema_id: &str,
        spec: &CredDefSpec,
    ) -> Result<String> {
        let request = spec.request(schema_id, issuer_did);
        match self.issuer.create_credential_definition(&request).await {
            Ok(cred_def_id) => {
                info!(cred_def_id = %cred_def_id, "credential definition created");
                Ok(cred_def_id)
            }
            Err(err) if err.is_conflict() => {
                info!(schema_id, "credential definition exists, looking it up");
                let found = self
                    .retry
                    .run("find_credential_definitions", || {
                        self.issuer.find_credential_definitions(schema_id)
                    })
                    .await
                    .map_err(|e| {
                        Error::Provisioning(format!("credential definition lookup failed: {}", e))
                    })?;
                found.into_iter().next().ok_or_else(|| {
                    Error::Provisioning(format!(
                        "credential definition for {} reported as existing but not found",
                        schema_id
                    ))
                })
            }
            Err(err) => {
                warn!(schema_id, error = %err, "credential definition creation failed");
                Err(Error::Provisioning(format!(
                    "credential definition creation failed: {}",
                    err
                )))
            }
        }
    }

    /// Resolve both objects, persisting each id as soon as it is known.
    ///
    /// A credential definition is only attempted once the schema id has
    /// been stored.
    pub async fn ensure_schema_and_cred_def(
        &self,
        issuer_did: &str,
        schema: &SchemaSpec,
        cred_def: &CredDefSpec,
    ) -> Result<(String, String)> {
        let schema_id = self.ensure_schema(issuer_did, schema).await?;
        self.state.set(keys::SCHEMA_ID, &schema_id).await?;

        let cred_def_id = self.ensure_cred_def(issuer_did, &schema_id, cred_def).await?;
        self.state.set(keys::CRED_DEF_ID, &cred_def_id).await?;

        Ok((schema_id, cred_def_id))
    }

    /// Resolve the issuer DID, then both ledger objects.
    pub async fn provision_issuer(
        &self,
        schema: &SchemaSpec,
        cred_def: &CredDefSpec,
    ) -> Result<ProvisionedIds> {
        let issuer_did = self.resolve_issuer_did().await?;
        info!(issuer_did = %issuer_did, "issuer DID resolved");
        self.state.set(keys::ISSUER_DID, &issuer_did).await?;

        let (schema_id, cred_def_id) = self
            .ensure_schema_and_cred_def(&issuer_did, schema, cred_def)
            .await?;
        Ok(ProvisionedIds {
            issuer_did,
            schema_id,
            cred_def_id,
        })
    }
}
