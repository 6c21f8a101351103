//! Presentation request construction.

use crate::agent::ProofRequest;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Shape of the presentation request sent to the holder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationRequestSpec {
    pub name: String,
    pub version: String,
    /// Referent of the requested attribute group
    pub referent: String,
    pub attribute_names: Vec<String>,
}

impl Default for PresentationRequestSpec {
    fn default() -> Self {
        Self {
            name: "Proof of Personhood Revocable".to_string(),
            version: "1.0".to_string(),
            referent: "0_personhood_uuid".to_string(),
            attribute_names: vec!["person_hash".to_string(), "biometric_score".to_string()],
        }
    }
}

impl PresentationRequestSpec {
    /// Request restricted to `cred_def_id` and requiring the credential to
    /// be unrevoked as of `now` (epoch seconds, also used as nonce).
    pub fn to_request(&self, connection_id: &str, cred_def_id: &str, now: i64) -> ProofRequest {
        let non_revoked = json!({"from": 0, "to": now});
        let mut requested_attributes = serde_json::Map::new();
        requested_attributes.insert(
            self.referent.clone(),
            json!({
                "names": self.attribute_names,
                "restrictions": [{"cred_def_id": cred_def_id}],
                "non_revoked": non_revoked,
            }),
        );

        ProofRequest {
            connection_id: connection_id.to_string(),
            presentation_request: json!({
                "anoncreds": {
                    "name": self.name,
                    "version": self.version,
                    "nonce": now.to_string(),
                    "requested_attributes": requested_attributes,
                    "requested_predicates": {},
                    "non_revoked": non_revoked,
                }
            }),
        }
    }
}
