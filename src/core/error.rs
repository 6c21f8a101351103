//! Error types for credflow.

use thiserror::Error;

/// Result type alias for credflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while orchestrating the credential lifecycle.
#[derive(Error, Debug)]
pub enum Error {
    // Transport errors
    #[error("Network fault: {0}")]
    Network(String),

    #[error("Agent fault (HTTP {status}): {body}")]
    Agent { status: u16, body: String },

    #[error("Protocol fault: {0}")]
    Protocol(String),

    // Workflow errors
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unrecognized {kind} state: {state}")]
    UnrecognizedState { kind: &'static str, state: String },

    #[error("Provisioning failed: {0}")]
    Provisioning(String),

    #[error("Timed out waiting for {what} after {polls} polls")]
    Timeout { what: String, polls: u32 },

    // Storage errors
    #[error("State storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Body marker agents use when a ledger object is already present.
pub const CONFLICT_MARKER: &str = "already exists";

impl Error {
    /// Build an agent fault from a status code and raw body.
    pub fn agent(status: u16, body: impl Into<String>) -> Self {
        Error::Agent {
            status,
            body: body.into(),
        }
    }

    /// Network faults and 5xx agent faults.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Agent { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The agent rejected a create because the resource already exists.
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Agent { status, body } => *status == 409 || body.contains(CONFLICT_MARKER),
            _ => false,
        }
    }

    /// The agent answered 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Agent { status: 404, .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::Protocol(err.to_string())
        } else {
            Error::Network(err.to_string())
        }
    }
}
