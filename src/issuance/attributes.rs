//! Personhood credential attributes and offers.

use crate::agent::{CredentialPreview, OfferRequest, PreviewAttribute, CREDENTIAL_PREVIEW_TYPE};
use crate::core::{epoch_seconds, Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const BIOMETRIC_SCORE_PATTERN: &str = r"^\d{1,3}(\.\d)?$";
const CONTROLLER_DID_PATTERN: &str = r"^did:sov:[a-zA-Z0-9]+$";

static BIOMETRIC_SCORE: OnceLock<Regex> = OnceLock::new();
static CONTROLLER_DID: OnceLock<Regex> = OnceLock::new();

/// Allowed `person_hash` length, inclusive.
pub const PERSON_HASH_LEN: (usize, usize) = (8, 128);

fn pattern(cell: &'static OnceLock<Regex>, source: &str) -> Result<&'static Regex> {
    if let Some(regex) = cell.get() {
        return Ok(regex);
    }
    let regex = Regex::new(source)
        .map_err(|e| Error::Config(format!("invalid pattern {}: {}", source, e)))?;
    Ok(cell.get_or_init(|| regex))
}

/// Attribute values of a personhood credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialAttributes {
    pub person_hash: String,
    /// Decimal in `[0, 100]` with at most one fractional digit
    pub biometric_score: String,
    /// Seconds since the Unix epoch
    pub timestamp: String,
    pub controller_did: String,
}

impl CredentialAttributes {
    /// Validated attributes stamped with the current time.
    pub fn new(person_hash: &str, biometric_score: &str, controller_did: &str) -> Result<Self> {
        Self::with_timestamp(
            person_hash,
            biometric_score,
            &epoch_seconds().to_string(),
            controller_did,
        )
    }

    /// Validated attributes with an explicit timestamp.
    pub fn with_timestamp(
        person_hash: &str,
        biometric_score: &str,
        timestamp: &str,
        controller_did: &str,
    ) -> Result<Self> {
        let attributes = Self {
            person_hash: person_hash.to_string(),
            biometric_score: biometric_score.to_string(),
            timestamp: timestamp.to_string(),
            controller_did: controller_did.to_string(),
        };
        attributes.validate()?;
        Ok(attributes)
    }

    /// Check every attribute constraint. Pure; performs no I/O.
    pub fn validate(&self) -> Result<()> {
        let len = self.person_hash.chars().count();
        if len < PERSON_HASH_LEN.0 || len > PERSON_HASH_LEN.1 {
            return Err(Error::Validation(format!(
                "person_hash must be {}-{} characters, got {}",
                PERSON_HASH_LEN.0, PERSON_HASH_LEN.1, len
            )));
        }

        if !pattern(&BIOMETRIC_SCORE, BIOMETRIC_SCORE_PATTERN)?.is_match(&self.biometric_score) {
            return Err(Error::Validation(format!(
                "biometric_score '{}' is not a decimal like 87.5",
                self.biometric_score
            )));
        }
        let score: f64 = self
            .biometric_score
            .parse()
            .map_err(|_| Error::Validation("biometric_score is not a number".into()))?;
        if !(0.0..=100.0).contains(&score) {
            return Err(Error::Validation(format!(
                "biometric_score {} outside [0, 100]",
                score
            )));
        }

        if self.timestamp.parse::<u64>().is_err() {
            return Err(Error::Validation(format!(
                "timestamp '{}' is not epoch seconds",
                self.timestamp
            )));
        }

        if !pattern(&CONTROLLER_DID, CONTROLLER_DID_PATTERN)?.is_match(&self.controller_did) {
            return Err(Error::Validation(format!(
                "controller_did '{}' is not a did:sov identifier",
                self.controller_did
            )));
        }
        Ok(())
    }

    /// Credential preview, attributes in schema order.
    pub fn to_preview(&self) -> CredentialPreview {
        let attribute = |name: &str, value: &str| PreviewAttribute {
            name: name.to_string(),
            value: value.to_string(),
        };
        CredentialPreview {
            preview_type: CREDENTIAL_PREVIEW_TYPE.to_string(),
            attributes: vec![
                attribute("person_hash", &self.person_hash),
                attribute("biometric_score", &self.biometric_score),
                attribute("timestamp", &self.timestamp),
                attribute("controller_did", &self.controller_did),
            ],
        }
    }
}

/// Fresh `did:sov` controller identifier.
pub fn generate_controller_did() -> String {
    format!("did:sov:{}", uuid::Uuid::new_v4().simple())
}

/// A validated offer, ready to send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialOffer {
    pub connection_id: String,
    pub attributes: CredentialAttributes,
    pub cred_def_id: String,
    /// Correlation token carried in the offer comment
    pub correlation_id: String,
}

impl CredentialOffer {
    pub fn new(
        connection_id: &str,
        attributes: CredentialAttributes,
        cred_def_id: &str,
    ) -> Result<Self> {
        attributes.validate()?;
        Ok(Self {
            connection_id: connection_id.to_string(),
            attributes,
            cred_def_id: cred_def_id.to_string(),
            correlation_id: uuid::Uuid::new_v4().to_string(),
        })
    }

    /// Send-offer body.
    pub fn to_request(&self) -> OfferRequest {
        OfferRequest {
            connection_id: self.connection_id.clone(),
            credential_preview: self.attributes.to_preview(),
            filter: serde_json::json!({"anoncreds": {"cred_def_id": self.cred_def_id}}),
            auto_remove: false,
            comment: Some(format!("credflow offer {}", self.correlation_id)),
        }
    }
}
