//! Agent endpoint configuration.

use crate::core::AgentRole;
use serde::{Deserialize, Serialize};

/// Connection settings for one agent's admin API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Which party this agent plays
    pub role: AgentRole,
    /// Admin API base URL, without trailing slash
    pub base_url: String,
    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Admin API key sent as `X-API-Key`
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl AgentConfig {
    pub fn new(role: AgentRole, base_url: &str) -> Self {
        Self {
            role,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
        }
    }
}

/// Admin endpoints of the three parties.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentEndpoints {
    pub issuer: AgentConfig,
    pub holder: AgentConfig,
    pub verifier: AgentConfig,
}

impl Default for AgentEndpoints {
    fn default() -> Self {
        Self {
            issuer: AgentConfig::new(AgentRole::Issuer, "http://localhost:8021"),
            holder: AgentConfig::new(AgentRole::Holder, "http://localhost:8031"),
            verifier: AgentConfig::new(AgentRole::Verifier, "http://localhost:8041"),
        }
    }
}
