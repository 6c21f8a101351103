//! Agent admin API payloads.
//!
//! Requests are built by the orchestrators; responses are remote-owned
//! snapshots that are never mutated locally.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Handshake protocol offered in out-of-band invitations.
pub const DIDEXCHANGE_PROTOCOL: &str = "https://didcomm.org/didexchange/1.0";

/// Type tag of the credential preview in an offer.
pub const CREDENTIAL_PREVIEW_TYPE: &str = "issue-credential/2.0/credential-preview";

// ==================== Connections ====================

/// A pairwise connection as reported by one agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub connection_id: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub their_label: Option<String>,
}

impl ConnectionRecord {
    pub fn is_active(&self) -> bool {
        matches!(self.state.as_deref(), Some("active") | Some("completed"))
    }
}

/// Body of a create-invitation call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvitationRequest {
    pub alias: String,
    pub handshake_protocols: Vec<String>,
}

impl InvitationRequest {
    /// DID exchange invitation labelled with `alias`.
    pub fn didexchange(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
            handshake_protocols: vec![DIDEXCHANGE_PROTOCOL.to_string()],
        }
    }
}

/// Out-of-band invitation created by the inviter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvitationRecord {
    /// The invitation message forwarded verbatim to the invitee
    pub invitation: serde_json::Value,
    #[serde(default)]
    pub invi_msg_id: Option<String>,
    #[serde(default)]
    pub oob_id: Option<String>,
}

/// Invitee-side record after receiving an invitation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OobRecord {
    #[serde(default)]
    pub oob_id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub connection_id: Option<String>,
}

// ==================== Schemas and definitions ====================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaBody {
    pub name: String,
    pub version: String,
    #[serde(rename = "attrNames")]
    pub attr_names: Vec<String>,
    #[serde(rename = "issuerId")]
    pub issuer_id: String,
}

/// Publication options of a create-schema call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaOptions {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            kind: "finished".to_string(),
        }
    }
}

/// Body of a create-schema call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaRequest {
    pub schema: SchemaBody,
    pub options: SchemaOptions,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CredDefBody {
    #[serde(rename = "schemaId")]
    pub schema_id: String,
    pub tag: String,
    #[serde(rename = "issuerId")]
    pub issuer_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CredDefOptions {
    pub support_revocation: bool,
    pub revocation_registry_size: u32,
}

/// Body of a create-credential-definition call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CredDefRequest {
    pub credential_definition: CredDefBody,
    pub options: CredDefOptions,
}

// ==================== Credential exchange ====================

/// Issuance handshake state.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CredExState {
    OfferSent,
    OfferReceived,
    RequestSent,
    RequestReceived,
    CredentialIssued,
    CredentialReceived,
    Done,
    /// Anything the agent reports that is not part of the handshake above
    Unknown(String),
}

impl CredExState {
    pub fn as_str(&self) -> &str {
        match self {
            CredExState::OfferSent => "offer-sent",
            CredExState::OfferReceived => "offer-received",
            CredExState::RequestSent => "request-sent",
            CredExState::RequestReceived => "request-received",
            CredExState::CredentialIssued => "credential-issued",
            CredExState::CredentialReceived => "credential-received",
            CredExState::Done => "done",
            CredExState::Unknown(s) => s.as_str(),
        }
    }
}

impl From<String> for CredExState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "offer-sent" => CredExState::OfferSent,
            "offer-received" => CredExState::OfferReceived,
            "request-sent" => CredExState::RequestSent,
            "request-received" => CredExState::RequestReceived,
            "credential-issued" => CredExState::CredentialIssued,
            "credential-received" => CredExState::CredentialReceived,
            "done" => CredExState::Done,
            _ => CredExState::Unknown(s),
        }
    }
}

impl From<CredExState> for String {
    fn from(state: CredExState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for CredExState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credential exchange record snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CredExRecord {
    pub cred_ex_id: String,
    pub state: CredExState,
    #[serde(default)]
    pub connection_id: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// Agents return the record either bare or inside a `cred_ex_record`
/// envelope.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CredExEnvelope {
    Wrapped { cred_ex_record: CredExRecord },
    Flat(CredExRecord),
}

impl From<CredExEnvelope> for CredExRecord {
    fn from(envelope: CredExEnvelope) -> Self {
        match envelope {
            CredExEnvelope::Wrapped { cred_ex_record } => cred_ex_record,
            CredExEnvelope::Flat(record) => record,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreviewAttribute {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CredentialPreview {
    #[serde(rename = "@type")]
    pub preview_type: String,
    pub attributes: Vec<PreviewAttribute>,
}

/// Body of a send-offer call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OfferRequest {
    pub connection_id: String,
    pub credential_preview: CredentialPreview,
    pub filter: serde_json::Value,
    pub auto_remove: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

// ==================== Presentation exchange ====================

/// Proof handshake state.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PresExState {
    RequestSent,
    RequestReceived,
    PresentationSent,
    PresentationReceived,
    Done,
    Verified,
    Abandoned,
    Unknown(String),
}

impl PresExState {
    pub fn as_str(&self) -> &str {
        match self {
            PresExState::RequestSent => "request-sent",
            PresExState::RequestReceived => "request-received",
            PresExState::PresentationSent => "presentation-sent",
            PresExState::PresentationReceived => "presentation-received",
            PresExState::Done => "done",
            PresExState::Verified => "verified",
            PresExState::Abandoned => "abandoned",
            PresExState::Unknown(s) => s.as_str(),
        }
    }
}

impl From<String> for PresExState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "request-sent" => PresExState::RequestSent,
            "request-received" => PresExState::RequestReceived,
            "presentation-sent" => PresExState::PresentationSent,
            "presentation-received" => PresExState::PresentationReceived,
            "done" => PresExState::Done,
            "verified" => PresExState::Verified,
            "abandoned" => PresExState::Abandoned,
            _ => PresExState::Unknown(s),
        }
    }
}

impl From<PresExState> for String {
    fn from(state: PresExState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for PresExState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation exchange record snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PresExRecord {
    pub pres_ex_id: String,
    pub state: PresExState,
    #[serde(default)]
    pub connection_id: Option<String>,
    /// Agents report this as a bool or as the strings "true"/"false"
    #[serde(default)]
    pub verified: Option<serde_json::Value>,
    #[serde(default)]
    pub verified_msgs: Option<Vec<String>>,
    #[serde(default)]
    pub error_msg: Option<String>,
}

/// Result of an explicit verify-presentation call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    #[serde(default)]
    pub verified: Option<serde_json::Value>,
    #[serde(default)]
    pub verified_msgs: Option<Vec<String>>,
    #[serde(default)]
    pub state: Option<String>,
}

impl VerificationResult {
    /// Strict check: only a JSON `true` or the string `"true"` counts.
    pub fn is_verified(&self) -> bool {
        is_true(self.verified.as_ref())
    }

    pub fn messages(&self) -> Vec<String> {
        self.verified_msgs.clone().unwrap_or_default()
    }
}

impl From<PresExRecord> for VerificationResult {
    fn from(record: PresExRecord) -> Self {
        Self {
            verified: record.verified,
            verified_msgs: record.verified_msgs,
            state: Some(record.state.to_string()),
        }
    }
}

/// Interpret an agent's `verified` field.
pub fn is_true(value: Option<&serde_json::Value>) -> bool {
    match value {
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Body of a send-proof-request call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProofRequest {
    pub connection_id: String,
    pub presentation_request: serde_json::Value,
}

// ==================== Wallet and revocation ====================

/// Credential held in the holder's wallet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub referent: String,
    #[serde(default)]
    pub schema_id: Option<String>,
    #[serde(default)]
    pub cred_def_id: Option<String>,
    #[serde(default)]
    pub rev_reg_id: Option<String>,
    #[serde(default)]
    pub cred_rev_id: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

/// Body of a revoke call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevokeRequest {
    pub rev_reg_id: String,
    pub cred_rev_id: String,
    pub publish: bool,
    pub notify: bool,
}
