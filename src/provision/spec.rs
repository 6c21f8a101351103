//! Ledger object specifications.

use crate::agent::{
    CredDefBody, CredDefOptions, CredDefRequest, SchemaBody, SchemaOptions, SchemaRequest,
};
use serde::{Deserialize, Serialize};

/// Schema to publish.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSpec {
    pub name: String,
    pub version: String,
    pub attr_names: Vec<String>,
}

impl Default for SchemaSpec {
    fn default() -> Self {
        Self {
            name: "personhood_credential_revocable".to_string(),
            version: "2.0".to_string(),
            attr_names: ["person_hash", "biometric_score", "timestamp", "controller_did"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl SchemaSpec {
    /// Create-schema body for `issuer_did`.
    pub fn request(&self, issuer_did: &str) -> SchemaRequest {
        SchemaRequest {
            schema: SchemaBody {
                name: self.name.clone(),
                version: self.version.clone(),
                attr_names: self.attr_names.clone(),
                issuer_id: issuer_did.to_string(),
            },
            options: SchemaOptions::default(),
        }
    }
}

/// Credential definition to publish over a schema.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredDefSpec {
    pub tag: String,
    pub support_revocation: bool,
    /// Capacity of each revocation registry
    pub revocation_registry_size: u32,
}

impl Default for CredDefSpec {
    fn default() -> Self {
        Self {
            tag: "gov_revocable_v1".to_string(),
            support_revocation: true,
            revocation_registry_size: 1000,
        }
    }
}

impl CredDefSpec {
    /// Create-credential-definition body.
    pub fn request(&self, schema_id: &str, issuer_did: &str) -> CredDefRequest {
        CredDefRequest {
            credential_definition: CredDefBody {
                schema_id: schema_id.to_string(),
                tag: self.tag.clone(),
                issuer_id: issuer_did.to_string(),
            },
            options: CredDefOptions {
                support_revocation: self.support_revocation,
                revocation_registry_size: self.revocation_registry_size,
            },
        }
    }
}
