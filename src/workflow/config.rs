//! Workflow configuration.
//!
//! Loaded from an optional JSON file; every section falls back to its
//! default when absent.

use crate::agent::AgentEndpoints;
use crate::connection::ConnectionPair;
use crate::core::{Error, Result};
use crate::proof::PresentationRequestSpec;
use crate::provision::{CredDefSpec, SchemaSpec};
use crate::retry::{PollConfig, RetryPolicy};
use crate::state::StateConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Connection aliases used by the workflow steps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionAliases {
    pub issuer_holder: ConnectionPair,
    pub verifier_holder: ConnectionPair,
}

impl Default for ConnectionAliases {
    fn default() -> Self {
        Self {
            issuer_holder: ConnectionPair::issuer_holder(),
            verifier_holder: ConnectionPair::verifier_holder(),
        }
    }
}

/// Full workflow configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Admin endpoints of the three agents
    pub agents: AgentEndpoints,
    pub aliases: ConnectionAliases,
    /// Wait for a new connection to become active
    pub connection_poll: PollConfig,
    /// Wait for the issuance handshake
    pub issuance_poll: PollConfig,
    /// Wait for a presentation
    pub proof_poll: PollConfig,
    /// Policy for sending offers and ledger lookups
    pub retry: RetryPolicy,
    pub schema: SchemaSpec,
    pub cred_def: CredDefSpec,
    pub proof_request: PresentationRequestSpec,
    pub state: StateConfig,
}

impl WorkflowConfig {
    /// Read a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        self.retry.validate()?;
        for (name, poll) in [
            ("connection_poll", &self.connection_poll),
            ("issuance_poll", &self.issuance_poll),
            ("proof_poll", &self.proof_poll),
        ] {
            if poll.max_polls == 0 {
                return Err(Error::Config(format!("{}.max_polls must be positive", name)));
            }
        }
        if self.schema.attr_names.is_empty() {
            return Err(Error::Config("schema needs at least one attribute".into()));
        }
        Ok(())
    }
}
