//! Common types used across credflow modules.

use serde::{Deserialize, Serialize};

/// The three parties of the credential lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Publishes schemas, credential definitions and credentials
    Issuer,
    /// Stores credentials and answers proof requests
    Holder,
    /// Requests and checks presentations
    Verifier,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentRole::Issuer => write!(f, "issuer"),
            AgentRole::Holder => write!(f, "holder"),
            AgentRole::Verifier => write!(f, "verifier"),
        }
    }
}

/// Timestamp wrapper for consistent serialization.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Get current UTC timestamp.
pub fn now() -> Timestamp {
    chrono::Utc::now()
}

/// Current time as whole seconds since the Unix epoch.
pub fn epoch_seconds() -> i64 {
    now().timestamp()
}
