//! Revocation of a holder's credential by the issuer.

use crate::agent::{AgentApi, RevokeRequest, StoredCredential};
use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Which of the holder's credentials to revoke.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSelector {
    /// First credential the holder lists
    First,
    /// Credential with this wallet referent
    Referent(String),
    /// Most recent credential issued under this definition
    CredDefId(String),
}

impl CredentialSelector {
    /// Pick a credential from the holder's wallet listing.
    pub fn select<'a>(&self, credentials: &'a [StoredCredential]) -> Option<&'a StoredCredential> {
        match self {
            CredentialSelector::First => credentials.first(),
            CredentialSelector::Referent(referent) => {
                credentials.iter().find(|c| &c.referent == referent)
            }
            CredentialSelector::CredDefId(cred_def_id) => credentials
                .iter()
                .rev()
                .find(|c| c.cred_def_id.as_deref() == Some(cred_def_id.as_str())),
        }
    }
}

impl std::fmt::Display for CredentialSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialSelector::First => write!(f, "first credential"),
            CredentialSelector::Referent(r) => write!(f, "referent {}", r),
            CredentialSelector::CredDefId(id) => write!(f, "cred def {}", id),
        }
    }
}

/// Registry coordinates of one issued credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationTarget {
    pub referent: String,
    pub rev_reg_id: String,
    pub cred_rev_id: String,
}

impl RevocationTarget {
    pub fn from_credential(credential: &StoredCredential) -> Result<Self> {
        let missing = |field: &str| {
            Error::Protocol(format!(
                "credential {} has no {}; was it issued as revocable?",
                credential.referent, field
            ))
        };
        Ok(Self {
            referent: credential.referent.clone(),
            rev_reg_id: credential
                .rev_reg_id
                .clone()
                .ok_or_else(|| missing("rev_reg_id"))?,
            cred_rev_id: credential
                .cred_rev_id
                .clone()
                .ok_or_else(|| missing("cred_rev_id"))?,
        })
    }

    /// Publish immediately, without notifying the holder.
    pub fn to_request(&self) -> RevokeRequest {
        RevokeRequest {
            rev_reg_id: self.rev_reg_id.clone(),
            cred_rev_id: self.cred_rev_id.clone(),
            publish: true,
            notify: false,
        }
    }
}

/// Result of a revoke call, decided by status code alone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RevocationOutcome {
    Revoked { target: RevocationTarget },
    Rejected { status: u16, body: String },
}

impl RevocationOutcome {
    pub fn is_revoked(&self) -> bool {
        matches!(self, RevocationOutcome::Revoked { .. })
    }
}

/// Revokes credentials the holder reports.
pub struct RevocationOrchestrator {
    issuer: Arc<dyn AgentApi>,
    holder: Arc<dyn AgentApi>,
}

impl RevocationOrchestrator {
    pub fn new(issuer: Arc<dyn AgentApi>, holder: Arc<dyn AgentApi>) -> Self {
        Self { issuer, holder }
    }

    /// Resolve the selected credential's registry coordinates.
    pub async fn target(&self, selector: &CredentialSelector) -> Result<RevocationTarget> {
        let credentials = self.holder.credentials().await?;
        if credentials.is_empty() {
            return Err(Error::Precondition("holder has no credentials".into()));
        }
        if credentials.len() > 1 && *selector == CredentialSelector::First {
            warn!(
                count = credentials.len(),
                "holder has several credentials, revoking the first"
            );
        }
        let credential = selector.select(&credentials).ok_or_else(|| {
            Error::Precondition(format!("no credential matches {}", selector))
        })?;
        RevocationTarget::from_credential(credential)
    }

    /// Revoke the selected credential and publish to the ledger.
    ///
    /// A non-2xx answer is reported as [`RevocationOutcome::Rejected`];
    /// network and protocol faults are returned as errors.
    pub async fn revoke(&self, selector: &CredentialSelector) -> Result<RevocationOutcome> {
        let target = self.target(selector).await?;
        info!(
            rev_reg_id = %target.rev_reg_id,
            cred_rev_id = %target.cred_rev_id,
            "revoking credential"
        );

        match self.issuer.revoke(&target.to_request()).await {
            Ok(()) => {
                info!(referent = %target.referent, "credential revoked and published");
                Ok(RevocationOutcome::Revoked { target })
            }
            Err(Error::Agent { status, body }) => {
                warn!(status, body = %body, "revocation rejected");
                Ok(RevocationOutcome::Rejected { status, body })
            }
            Err(err) => Err(err),
        }
    }

    /// Revocation registries of a credential definition.
    pub async fn list_revocation_registries(&self, cred_def_id: &str) -> Result<Vec<String>> {
        self.issuer.revocation_registries(cred_def_id).await
    }
}
