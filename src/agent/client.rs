//! HTTP client for an agent's admin API.

use crate::agent::api::AgentApi;
use crate::agent::config::AgentConfig;
use crate::agent::types::*;
use crate::core::{AgentRole, Error, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Deserialize)]
struct Results<T> {
    results: Vec<T>,
}

#[derive(Deserialize)]
struct DidInfo {
    did: String,
}

#[derive(Deserialize)]
struct PublicDidResponse {
    result: Option<DidInfo>,
}

#[derive(Deserialize)]
struct SchemaState {
    schema_id: String,
}

#[derive(Deserialize)]
struct SchemaCreated {
    schema_state: SchemaState,
}

#[derive(Deserialize)]
struct SchemaIds {
    schema_ids: Vec<String>,
}

#[derive(Deserialize)]
struct CredDefState {
    credential_definition_id: String,
}

#[derive(Deserialize)]
struct CredDefCreated {
    credential_definition_state: CredDefState,
}

#[derive(Deserialize)]
struct CredDefIds {
    credential_definition_ids: Vec<String>,
}

#[derive(Deserialize)]
struct RevRegIds {
    rev_reg_ids: Vec<String>,
}

/// HTTP client for one agent's admin API.
///
/// # Example
///
/// ```rust,no_run
/// use credflow::agent::{AgentApi, AgentClient, AgentConfig};
/// use credflow::core::AgentRole;
///
/// # async fn example() -> credflow::Result<()> {
/// let issuer = AgentClient::new(AgentConfig::new(AgentRole::Issuer, "http://localhost:8021"))?;
/// let did = issuer.public_did().await?;
/// println!("issuer DID: {:?}", did);
/// # Ok(())
/// # }
/// ```
pub struct AgentClient {
    config: AgentConfig,
    client: Client,
}

impl AgentClient {
    /// Create a new agent client.
    pub fn new(config: AgentConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref api_key) = config.api_key {
            let value = header::HeaderValue::from_str(api_key)
                .map_err(|e| Error::Config(format!("invalid API key: {}", e)))?;
            headers.insert("X-API-Key", value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    // ==================== Helper Methods ====================

    /// Admin URL for `path`; each segment is percent-encoded on its own.
    fn url(&self, path: &[&str], params: &[(&str, &str)]) -> Result<Url> {
        let invalid = || Error::Config(format!("invalid agent URL {}", self.config.base_url));
        let mut url = Url::parse(&self.config.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(path);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    fn request(&self, method: Method, path: &[&str], params: &[(&str, &str)]) -> Result<RequestBuilder> {
        Ok(self.client.request(method, self.url(path, params)?))
    }

    /// Send and return the raw body of a 2xx response.
    async fn execute(&self, request: RequestBuilder) -> Result<String> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!(role = %self.config.role, status = status.as_u16(), "agent response");

        if !status.is_success() {
            return Err(Error::agent(status.as_u16(), body));
        }
        Ok(body)
    }

    fn decode<T: DeserializeOwned>(&self, what: &str, body: &str) -> Result<T> {
        serde_json::from_str(body).map_err(|e| {
            Error::Protocol(format!(
                "{} returned unexpected {} payload: {}",
                self.config.role, what, e
            ))
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &[&str], params: &[(&str, &str)]) -> Result<T> {
        let request = self.request(Method::GET, path, params)?;
        let body = self.execute(request).await?;
        self.decode(&path.join("/"), &body)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &[&str],
        params: &[(&str, &str)],
        payload: &B,
    ) -> Result<T> {
        let request = self.request(Method::POST, path, params)?.json(payload);
        let body = self.execute(request).await?;
        self.decode(&path.join("/"), &body)
    }

    async fn post_ignoring_body<B: Serialize + ?Sized>(&self, path: &[&str], payload: &B) -> Result<()> {
        let request = self.request(Method::POST, path, &[])?.json(payload);
        self.execute(request).await.map(|_| ())
    }

    async fn delete(&self, path: &[&str]) -> Result<()> {
        let request = self.request(Method::DELETE, path, &[])?;
        self.execute(request).await.map(|_| ())
    }

    async fn post_cred_ex<B: Serialize + ?Sized>(&self, path: &[&str], payload: &B) -> Result<CredExRecord> {
        let envelope: CredExEnvelope = self.post_json(path, &[], payload).await?;
        Ok(envelope.into())
    }
}

#[async_trait]
impl AgentApi for AgentClient {
    fn role(&self) -> AgentRole {
        self.config.role
    }

    async fn public_did(&self) -> Result<Option<String>> {
        let response: PublicDidResponse = self.get_json(&["wallet", "did", "public"], &[]).await?;
        Ok(response.result.map(|info| info.did))
    }

    async fn connections(&self, alias: &str, state: Option<&str>) -> Result<Vec<ConnectionRecord>> {
        let mut params = vec![("alias", alias)];
        if let Some(state) = state {
            params.push(("state", state));
        }
        let response: Results<ConnectionRecord> = self.get_json(&["connections"], &params).await?;
        Ok(response.results)
    }

    async fn create_invitation(&self, request: &InvitationRequest) -> Result<InvitationRecord> {
        self.post_json(&["out-of-band", "create-invitation"], &[], request)
            .await
    }

    async fn receive_invitation(
        &self,
        invitation: &serde_json::Value,
        alias: &str,
    ) -> Result<OobRecord> {
        self.post_json(&["out-of-band", "receive-invitation"], &[("alias", alias)], invitation)
            .await
    }

    async fn create_schema(&self, request: &SchemaRequest) -> Result<String> {
        let response: SchemaCreated = self.post_json(&["anoncreds", "schema"], &[], request).await?;
        Ok(response.schema_state.schema_id)
    }

    async fn find_schemas(&self, issuer_id: &str, name: &str, version: &str) -> Result<Vec<String>> {
        let params = [
            ("schema_issuer_id", issuer_id),
            ("schema_name", name),
            ("schema_version", version),
        ];
        let response: SchemaIds = self.get_json(&["anoncreds", "schemas"], &params).await?;
        Ok(response.schema_ids)
    }

    async fn get_schema(&self, schema_id: &str) -> Result<serde_json::Value> {
        self.get_json(&["anoncreds", "schema", schema_id], &[])
            .await
    }

    async fn create_credential_definition(&self, request: &CredDefRequest) -> Result<String> {
        let response: CredDefCreated = self
            .post_json(&["anoncreds", "credential-definition"], &[], request)
            .await?;
        Ok(response.credential_definition_state.credential_definition_id)
    }

    async fn find_credential_definitions(&self, schema_id: &str) -> Result<Vec<String>> {
        let response: CredDefIds = self
            .get_json(&["anoncreds", "credential-definitions"], &[("schema_id", schema_id)])
            .await?;
        Ok(response.credential_definition_ids)
    }

    async fn get_credential_definition(&self, cred_def_id: &str) -> Result<serde_json::Value> {
        self.get_json(&["anoncreds", "credential-definition", cred_def_id], &[])
            .await
    }

    async fn send_offer(&self, offer: &OfferRequest) -> Result<CredExRecord> {
        self.post_cred_ex(&["issue-credential-2.0", "send-offer"], offer).await
    }

    async fn credential_exchanges(&self, state: Option<&CredExState>) -> Result<Vec<CredExRecord>> {
        let params: Vec<(&str, &str)> = state.map(|s| ("state", s.as_str())).into_iter().collect();
        let response: Results<CredExEnvelope> = self
            .get_json(&["issue-credential-2.0", "records"], &params)
            .await?;
        Ok(response.results.into_iter().map(CredExRecord::from).collect())
    }

    async fn credential_exchange(&self, cred_ex_id: &str) -> Result<CredExRecord> {
        let envelope: CredExEnvelope = self
            .get_json(&["issue-credential-2.0", "records", cred_ex_id], &[])
            .await?;
        Ok(envelope.into())
    }

    async fn send_request(&self, cred_ex_id: &str) -> Result<CredExRecord> {
        self.post_cred_ex(
            &["issue-credential-2.0", "records", cred_ex_id, "send-request"],
            &serde_json::json!({}),
        )
        .await
    }

    async fn issue_credential(&self, cred_ex_id: &str, comment: &str) -> Result<CredExRecord> {
        self.post_cred_ex(
            &["issue-credential-2.0", "records", cred_ex_id, "issue"],
            &serde_json::json!({ "comment": comment }),
        )
        .await
    }

    async fn store_credential(&self, cred_ex_id: &str, credential_id: &str) -> Result<CredExRecord> {
        self.post_cred_ex(
            &["issue-credential-2.0", "records", cred_ex_id, "store"],
            &serde_json::json!({ "credential_id": credential_id }),
        )
        .await
    }

    async fn delete_credential_exchange(&self, cred_ex_id: &str) -> Result<()> {
        self.delete(&["issue-credential-2.0", "records", cred_ex_id])
            .await
    }

    async fn send_proof_request(&self, request: &ProofRequest) -> Result<PresExRecord> {
        self.post_json(&["present-proof-2.0", "send-request"], &[], request)
            .await
    }

    async fn presentation_exchange(&self, pres_ex_id: &str) -> Result<PresExRecord> {
        self.get_json(&["present-proof-2.0", "records", pres_ex_id], &[])
            .await
    }

    async fn verify_presentation(&self, pres_ex_id: &str) -> Result<VerificationResult> {
        self.post_json(
            &["present-proof-2.0", "records", pres_ex_id, "verify-presentation"],
            &[],
            &serde_json::json!({}),
        )
        .await
    }

    async fn credentials(&self) -> Result<Vec<StoredCredential>> {
        let response: Results<StoredCredential> = self.get_json(&["credentials"], &[]).await?;
        Ok(response.results)
    }

    async fn delete_credential(&self, referent: &str) -> Result<()> {
        self.delete(&["credential", referent]).await
    }

    async fn revoke(&self, request: &RevokeRequest) -> Result<()> {
        self.post_ignoring_body(&["anoncreds", "revocation", "revoke"], request)
            .await
    }

    async fn revocation_registries(&self, cred_def_id: &str) -> Result<Vec<String>> {
        let response: RevRegIds = self
            .get_json(
                &["anoncreds", "revocation", "registries"],
                &[("cred_def_id", cred_def_id)],
            )
            .await?;
        Ok(response.rev_reg_ids)
    }
}
