//! In-memory agent network for orchestrator tests.
//!
//! Simulates issuer, holder and verifier admin APIs sharing one ledger and
//! one set of exchange records. Behaviour knobs reproduce the asynchronous
//! quirks the orchestrators have to tolerate, and faults can be scripted
//! per agent and operation.

use crate::agent::api::{AgentApi, AgentSet};
use crate::agent::types::*;
use crate::core::{AgentRole, Error, Result};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Knobs for the simulated agents.
#[derive(Clone, Debug)]
pub struct FakeBehavior {
    /// Issuer public DID; `None` simulates an unconfigured wallet
    pub issuer_did: Option<String>,
    /// Invitations never complete the DID exchange
    pub connections_stall: bool,
    /// Holder answers offers on its own
    pub holder_auto_request: bool,
    /// State the holder's record starts in instead of offer-received
    pub holder_initial_state: Option<CredExState>,
    /// Holder list calls that miss a freshly offered exchange
    pub holder_record_lag: u32,
    /// Issuer answers credential requests on its own
    pub issuer_auto_issue: bool,
    /// Polls of a presentation record before the presentation arrives
    pub presentation_delay: u32,
    /// The presentation never arrives
    pub verifier_stuck: bool,
    /// The presentation record disappears after creation
    pub presentation_vanishes: bool,
    /// Report `verified` as the strings "true"/"false" instead of booleans
    pub verified_as_string: bool,
}

impl Default for FakeBehavior {
    fn default() -> Self {
        Self {
            issuer_did: Some("did:sov:ABC123".to_string()),
            connections_stall: false,
            holder_auto_request: false,
            holder_initial_state: None,
            holder_record_lag: 0,
            issuer_auto_issue: true,
            presentation_delay: 1,
            verifier_stuck: false,
            presentation_vanishes: false,
            verified_as_string: true,
        }
    }
}

struct Schema {
    id: String,
    issuer: String,
    name: String,
    version: String,
}

struct CredDef {
    id: String,
    schema_id: String,
    tag: String,
}

struct Exchange {
    issuer: CredExRecord,
    holder: CredExRecord,
    cred_def_id: String,
    attrs: Vec<PreviewAttribute>,
    hidden_from_holder: u32,
}

struct Presentation {
    record: PresExRecord,
    cred_def_id: Option<String>,
    polls: u32,
    presented: Option<(String, String)>,
}

#[derive(Default)]
struct World {
    behavior: FakeBehavior,
    seq: u64,
    schemas: Vec<Schema>,
    cred_defs: Vec<CredDef>,
    invitations: HashMap<String, (AgentRole, String)>,
    connections: Vec<(AgentRole, ConnectionRecord)>,
    exchanges: Vec<Exchange>,
    wallet: Vec<StoredCredential>,
    issued: Vec<(String, String)>,
    revoked: HashSet<(String, String)>,
    presentations: Vec<Presentation>,
    calls: Vec<(AgentRole, &'static str)>,
    faults: HashMap<(AgentRole, &'static str), VecDeque<Error>>,
}

impl World {
    fn next_id(&mut self, prefix: &str) -> String {
        self.seq += 1;
        format!("{}-{}", prefix, self.seq)
    }

    fn enter(&mut self, role: AgentRole, op: &'static str) -> Result<()> {
        self.calls.push((role, op));
        match self.faults.get_mut(&(role, op)).and_then(|queue| queue.pop_front()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn side(exchange: &Exchange, role: AgentRole) -> &CredExRecord {
        if role == AgentRole::Issuer {
            &exchange.issuer
        } else {
            &exchange.holder
        }
    }

    fn exchange_mut(&mut self, role: AgentRole, cred_ex_id: &str) -> Result<&mut Exchange> {
        self.exchanges
            .iter_mut()
            .find(|ex| World::side(ex, role).cred_ex_id == cred_ex_id)
            .ok_or_else(|| Error::agent(404, format!("Record {} not found", cred_ex_id)))
    }

    fn send_request(&mut self, holder_id: &str) -> Result<CredExRecord> {
        let auto_issue = self.behavior.issuer_auto_issue;
        let exchange = self.exchange_mut(AgentRole::Holder, holder_id)?;
        if exchange.holder.state != CredExState::OfferReceived {
            return Err(Error::agent(
                400,
                format!("Invalid state {} for send-request", exchange.holder.state),
            ));
        }
        exchange.holder.state = CredExState::RequestSent;
        exchange.issuer.state = CredExState::RequestReceived;
        if auto_issue {
            exchange.issuer.state = CredExState::CredentialIssued;
            exchange.holder.state = CredExState::CredentialReceived;
        }
        Ok(exchange.holder.clone())
    }
}

/// Shared simulated network.
#[derive(Clone, Default)]
pub struct FakeNetwork {
    world: Arc<Mutex<World>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: FakeBehavior) -> Self {
        let network = Self::new();
        network.lock().behavior = behavior;
        network
    }

    fn lock(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap()
    }

    /// Change behaviour mid-test.
    pub fn update_behavior(&self, update: impl FnOnce(&mut FakeBehavior)) {
        update(&mut self.lock().behavior);
    }

    pub fn agent(&self, role: AgentRole) -> Arc<dyn AgentApi> {
        Arc::new(FakeAgent {
            role,
            world: self.world.clone(),
        })
    }

    pub fn agents(&self) -> AgentSet {
        AgentSet::new(
            self.agent(AgentRole::Issuer),
            self.agent(AgentRole::Holder),
            self.agent(AgentRole::Verifier),
        )
    }

    /// Make the next call of `op` on `role` fail with `err`.
    pub fn fail_next(&self, role: AgentRole, op: &'static str, err: Error) {
        self.lock()
            .faults
            .entry((role, op))
            .or_default()
            .push_back(err);
    }

    /// Number of calls of `op` made against `role`.
    pub fn calls(&self, role: AgentRole, op: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|(r, o)| *r == role && *o == op)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn wallet(&self) -> Vec<StoredCredential> {
        self.lock().wallet.clone()
    }

    pub fn offers_sent(&self) -> usize {
        self.lock().exchanges.len()
    }

    /// Seed an active connection pair without the invitation dance.
    pub fn seed_connection(
        &self,
        inviter: AgentRole,
        inviter_alias: &str,
        invitee: AgentRole,
        invitee_alias: &str,
    ) -> String {
        let mut world = self.lock();
        let inviter_id = world.next_id("conn");
        let invitee_id = world.next_id("conn");
        world
            .connections
            .push((inviter, connection(&inviter_id, inviter_alias, "active")));
        world
            .connections
            .push((invitee, connection(&invitee_id, invitee_alias, "active")));
        inviter_id
    }

    /// Seed a schema and revocable credential definition on the ledger.
    pub fn seed_cred_def(&self) -> (String, String) {
        let mut world = self.lock();
        let did = world.behavior.issuer_did.clone().unwrap_or_default();
        let schema_id = format!("{}:2:personhood_credential_revocable:2.0", did);
        let seq = world.next_id("seq");
        let cred_def_id = format!("{}:3:CL:{}:gov_revocable_v1", did, seq);
        world.schemas.push(Schema {
            id: schema_id.clone(),
            issuer: did,
            name: "personhood_credential_revocable".into(),
            version: "2.0".into(),
        });
        world.cred_defs.push(CredDef {
            id: cred_def_id.clone(),
            schema_id: schema_id.clone(),
            tag: "gov_revocable_v1".into(),
        });
        (schema_id, cred_def_id)
    }

    /// Put a credential straight into the holder wallet.
    pub fn seed_wallet_credential(&self, credential: StoredCredential) {
        let mut world = self.lock();
        if let (Some(reg), Some(rev)) = (&credential.rev_reg_id, &credential.cred_rev_id) {
            world.issued.push((reg.clone(), rev.clone()));
        }
        world.wallet.push(credential);
    }

    pub fn is_revoked(&self, rev_reg_id: &str, cred_rev_id: &str) -> bool {
        self.lock()
            .revoked
            .contains(&(rev_reg_id.to_string(), cred_rev_id.to_string()))
    }
}

fn connection(connection_id: &str, alias: &str, state: &str) -> ConnectionRecord {
    ConnectionRecord {
        connection_id: connection_id.to_string(),
        alias: Some(alias.to_string()),
        state: Some(state.to_string()),
        their_label: None,
    }
}

fn revocation_registry(cred_def_id: &str) -> String {
    format!("revreg:{}", cred_def_id)
}

/// One simulated agent.
pub struct FakeAgent {
    role: AgentRole,
    world: Arc<Mutex<World>>,
}

impl FakeAgent {
    fn enter(&self, op: &'static str) -> Result<MutexGuard<'_, World>> {
        let mut world = self.world.lock().unwrap();
        world.enter(self.role, op)?;
        Ok(world)
    }
}

#[async_trait]
impl AgentApi for FakeAgent {
    fn role(&self) -> AgentRole {
        self.role
    }

    async fn public_did(&self) -> Result<Option<String>> {
        let world = self.enter("public_did")?;
        Ok(match self.role {
            AgentRole::Issuer => world.behavior.issuer_did.clone(),
            _ => None,
        })
    }

    async fn connections(&self, alias: &str, state: Option<&str>) -> Result<Vec<ConnectionRecord>> {
        let world = self.enter("connections")?;
        Ok(world
            .connections
            .iter()
            .filter(|(owner, c)| {
                *owner == self.role
                    && c.alias.as_deref() == Some(alias)
                    && state.map_or(true, |s| c.state.as_deref() == Some(s))
            })
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn create_invitation(&self, request: &InvitationRequest) -> Result<InvitationRecord> {
        let mut world = self.enter("create_invitation")?;
        let id = world.next_id("inv");
        world
            .invitations
            .insert(id.clone(), (self.role, request.alias.clone()));
        Ok(InvitationRecord {
            invitation: json!({
                "@id": id,
                "label": request.alias,
                "handshake_protocols": request.handshake_protocols,
            }),
            invi_msg_id: Some(id.clone()),
            oob_id: Some(format!("oob-{}", id)),
        })
    }

    async fn receive_invitation(
        &self,
        invitation: &serde_json::Value,
        alias: &str,
    ) -> Result<OobRecord> {
        let mut world = self.enter("receive_invitation")?;
        let id = invitation["@id"].as_str().unwrap_or_default().to_string();
        let (inviter, inviter_alias) = world
            .invitations
            .remove(&id)
            .ok_or_else(|| Error::agent(400, format!("Unknown invitation {}", id)))?;
        let state = if world.behavior.connections_stall {
            "request"
        } else {
            "active"
        };
        let inviter_conn = world.next_id("conn");
        let invitee_conn = world.next_id("conn");
        world
            .connections
            .push((inviter, connection(&inviter_conn, &inviter_alias, state)));
        world
            .connections
            .push((self.role, connection(&invitee_conn, alias, state)));
        Ok(OobRecord {
            oob_id: Some(format!("oob-{}", id)),
            state: Some("done".into()),
            connection_id: Some(invitee_conn),
        })
    }

    async fn create_schema(&self, request: &SchemaRequest) -> Result<String> {
        let mut world = self.enter("create_schema")?;
        let schema = &request.schema;
        if world.schemas.iter().any(|s| {
            s.issuer == schema.issuer_id && s.name == schema.name && s.version == schema.version
        }) {
            return Err(Error::agent(
                400,
                format!("Schema {} {} already exists", schema.name, schema.version),
            ));
        }
        let id = format!("{}:2:{}:{}", schema.issuer_id, schema.name, schema.version);
        world.schemas.push(Schema {
            id: id.clone(),
            issuer: schema.issuer_id.clone(),
            name: schema.name.clone(),
            version: schema.version.clone(),
        });
        Ok(id)
    }

    async fn find_schemas(&self, issuer_id: &str, name: &str, version: &str) -> Result<Vec<String>> {
        let world = self.enter("find_schemas")?;
        Ok(world
            .schemas
            .iter()
            .filter(|s| s.issuer == issuer_id && s.name == name && s.version == version)
            .map(|s| s.id.clone())
            .collect())
    }

    async fn get_schema(&self, schema_id: &str) -> Result<serde_json::Value> {
        let world = self.enter("get_schema")?;
        world
            .schemas
            .iter()
            .find(|s| s.id == schema_id)
            .map(|s| json!({"schema_id": s.id, "schema": {"name": s.name, "version": s.version}}))
            .ok_or_else(|| Error::agent(404, "Schema not found"))
    }

    async fn create_credential_definition(&self, request: &CredDefRequest) -> Result<String> {
        let mut world = self.enter("create_credential_definition")?;
        let body = &request.credential_definition;
        if !world.schemas.iter().any(|s| s.id == body.schema_id) {
            return Err(Error::agent(400, format!("Schema {} not found", body.schema_id)));
        }
        if world
            .cred_defs
            .iter()
            .any(|c| c.schema_id == body.schema_id && c.tag == body.tag)
        {
            return Err(Error::agent(
                400,
                "Credential definition with this tag already exists",
            ));
        }
        let seq = world.next_id("seq");
        let id = format!("{}:3:CL:{}:{}", body.issuer_id, seq, body.tag);
        world.cred_defs.push(CredDef {
            id: id.clone(),
            schema_id: body.schema_id.clone(),
            tag: body.tag.clone(),
        });
        Ok(id)
    }

    async fn find_credential_definitions(&self, schema_id: &str) -> Result<Vec<String>> {
        let world = self.enter("find_credential_definitions")?;
        Ok(world
            .cred_defs
            .iter()
            .filter(|c| c.schema_id == schema_id)
            .map(|c| c.id.clone())
            .collect())
    }

    async fn get_credential_definition(&self, cred_def_id: &str) -> Result<serde_json::Value> {
        let world = self.enter("get_credential_definition")?;
        world
            .cred_defs
            .iter()
            .find(|c| c.id == cred_def_id)
            .map(|c| json!({"credential_definition_id": c.id, "schema_id": c.schema_id}))
            .ok_or_else(|| Error::agent(404, "Credential definition not found"))
    }

    async fn send_offer(&self, offer: &OfferRequest) -> Result<CredExRecord> {
        let mut world = self.enter("send_offer")?;
        let cred_def_id = offer.filter["anoncreds"]["cred_def_id"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        if !world.cred_defs.iter().any(|c| c.id == cred_def_id) {
            return Err(Error::agent(400, format!("Unknown cred_def_id {}", cred_def_id)));
        }
        if !world
            .connections
            .iter()
            .any(|(owner, c)| *owner == self.role && c.connection_id == offer.connection_id)
        {
            return Err(Error::agent(
                404,
                format!("Connection {} not found", offer.connection_id),
            ));
        }

        let thread_id = world.next_id("thread");
        let issuer_id = world.next_id("iss-cx");
        let holder_id = world.next_id("hld-cx");
        let holder_state = world
            .behavior
            .holder_initial_state
            .clone()
            .unwrap_or(CredExState::OfferReceived);
        let auto_request =
            world.behavior.holder_auto_request && holder_state == CredExState::OfferReceived;
        let hidden_from_holder = world.behavior.holder_record_lag;
        world.exchanges.push(Exchange {
            issuer: CredExRecord {
                cred_ex_id: issuer_id,
                state: CredExState::OfferSent,
                connection_id: Some(offer.connection_id.clone()),
                thread_id: Some(thread_id.clone()),
            },
            holder: CredExRecord {
                cred_ex_id: holder_id.clone(),
                state: holder_state,
                connection_id: None,
                thread_id: Some(thread_id),
            },
            cred_def_id,
            attrs: offer.credential_preview.attributes.clone(),
            hidden_from_holder,
        });
        if auto_request {
            world.send_request(&holder_id)?;
        }
        let issuer_record = world
            .exchanges
            .last()
            .map(|ex| ex.issuer.clone())
            .ok_or_else(|| Error::agent(500, "exchange lost"))?;
        Ok(issuer_record)
    }

    async fn credential_exchanges(&self, state: Option<&CredExState>) -> Result<Vec<CredExRecord>> {
        let mut world = self.enter("credential_exchanges")?;
        let role = self.role;
        let mut records = Vec::new();
        for exchange in world.exchanges.iter_mut() {
            if role == AgentRole::Holder && exchange.hidden_from_holder > 0 {
                exchange.hidden_from_holder -= 1;
                continue;
            }
            let record = World::side(exchange, role);
            if state.map_or(true, |s| &record.state == s) {
                records.push(record.clone());
            }
        }
        Ok(records)
    }

    async fn credential_exchange(&self, cred_ex_id: &str) -> Result<CredExRecord> {
        let mut world = self.enter("credential_exchange")?;
        let role = self.role;
        let exchange = world.exchange_mut(role, cred_ex_id)?;
        Ok(World::side(exchange, role).clone())
    }

    async fn send_request(&self, cred_ex_id: &str) -> Result<CredExRecord> {
        let mut world = self.enter("send_request")?;
        world.send_request(cred_ex_id)
    }

    async fn issue_credential(&self, cred_ex_id: &str, _comment: &str) -> Result<CredExRecord> {
        let mut world = self.enter("issue_credential")?;
        let exchange = world.exchange_mut(AgentRole::Issuer, cred_ex_id)?;
        if exchange.issuer.state != CredExState::RequestReceived {
            return Err(Error::agent(
                400,
                format!("Invalid state {} for issue", exchange.issuer.state),
            ));
        }
        exchange.issuer.state = CredExState::CredentialIssued;
        exchange.holder.state = CredExState::CredentialReceived;
        Ok(exchange.issuer.clone())
    }

    async fn store_credential(&self, cred_ex_id: &str, _credential_id: &str) -> Result<CredExRecord> {
        let mut world = self.enter("store_credential")?;
        let (record, cred_def_id, attrs) = {
            let exchange = world.exchange_mut(AgentRole::Holder, cred_ex_id)?;
            if exchange.holder.state != CredExState::CredentialReceived {
                return Err(Error::agent(
                    400,
                    format!("Invalid state {} for store", exchange.holder.state),
                ));
            }
            exchange.holder.state = CredExState::Done;
            exchange.issuer.state = CredExState::Done;
            (
                exchange.holder.clone(),
                exchange.cred_def_id.clone(),
                exchange.attrs.clone(),
            )
        };

        let referent = world.next_id("cred");
        let rev_reg_id = revocation_registry(&cred_def_id);
        let cred_rev_id = (world.issued.len() + 1).to_string();
        world.issued.push((rev_reg_id.clone(), cred_rev_id.clone()));
        world.wallet.push(StoredCredential {
            referent,
            schema_id: None,
            cred_def_id: Some(cred_def_id),
            rev_reg_id: Some(rev_reg_id),
            cred_rev_id: Some(cred_rev_id),
            attrs: attrs.into_iter().map(|a| (a.name, a.value)).collect(),
        });
        Ok(record)
    }

    async fn delete_credential_exchange(&self, cred_ex_id: &str) -> Result<()> {
        let mut world = self.enter("delete_credential_exchange")?;
        let role = self.role;
        let before = world.exchanges.len();
        world
            .exchanges
            .retain(|ex| World::side(ex, role).cred_ex_id != cred_ex_id);
        if world.exchanges.len() == before {
            return Err(Error::agent(404, "Record not found"));
        }
        Ok(())
    }

    async fn send_proof_request(&self, request: &ProofRequest) -> Result<PresExRecord> {
        let mut world = self.enter("send_proof_request")?;
        let cred_def_id = request.presentation_request["anoncreds"]["requested_attributes"]
            .as_object()
            .and_then(|attrs| attrs.values().next())
            .and_then(|attr| attr["restrictions"][0]["cred_def_id"].as_str())
            .map(str::to_string);
        let id = world.next_id("pres");
        let record = PresExRecord {
            pres_ex_id: id,
            state: PresExState::RequestSent,
            connection_id: Some(request.connection_id.clone()),
            verified: None,
            verified_msgs: None,
            error_msg: None,
        };
        world.presentations.push(Presentation {
            record: record.clone(),
            cred_def_id,
            polls: 0,
            presented: None,
        });
        Ok(record)
    }

    async fn presentation_exchange(&self, pres_ex_id: &str) -> Result<PresExRecord> {
        let mut world = self.enter("presentation_exchange")?;
        if world.behavior.presentation_vanishes {
            return Err(Error::agent(404, "Record not found"));
        }
        let behavior = world.behavior.clone();
        let wallet = world.wallet.clone();
        let presentation = world
            .presentations
            .iter_mut()
            .find(|p| p.record.pres_ex_id == pres_ex_id)
            .ok_or_else(|| Error::agent(404, "Record not found"))?;

        presentation.polls += 1;
        if !behavior.verifier_stuck
            && presentation.polls >= behavior.presentation_delay
            && presentation.record.state == PresExState::RequestSent
        {
            let held = wallet
                .iter()
                .rev()
                .find(|c| c.cred_def_id == presentation.cred_def_id);
            match held {
                Some(credential) => {
                    presentation.presented = credential
                        .rev_reg_id
                        .clone()
                        .zip(credential.cred_rev_id.clone());
                    presentation.record.state = PresExState::PresentationReceived;
                }
                None => {
                    presentation.record.state = PresExState::Abandoned;
                    presentation.record.error_msg =
                        Some("No matching credential in holder wallet".into());
                }
            }
        }
        Ok(presentation.record.clone())
    }

    async fn verify_presentation(&self, pres_ex_id: &str) -> Result<VerificationResult> {
        let mut world = self.enter("verify_presentation")?;
        let revoked = world.revoked.clone();
        let as_string = world.behavior.verified_as_string;
        let presentation = world
            .presentations
            .iter_mut()
            .find(|p| p.record.pres_ex_id == pres_ex_id)
            .ok_or_else(|| Error::agent(404, "Record not found"))?;
        if presentation.record.state != PresExState::PresentationReceived {
            return Err(Error::agent(
                400,
                format!("Invalid state {} for verify", presentation.record.state),
            ));
        }

        let is_revoked = presentation
            .presented
            .as_ref()
            .map_or(false, |target| revoked.contains(target));
        let verified = !is_revoked;
        let messages = if is_revoked {
            vec!["RMV_RFNT_NRI::0_personhood_uuid: credential revoked".to_string()]
        } else {
            Vec::new()
        };

        presentation.record.state = PresExState::Done;
        presentation.record.verified = Some(if as_string {
            json!(verified.to_string())
        } else {
            json!(verified)
        });
        presentation.record.verified_msgs = Some(messages);
        Ok(presentation.record.clone().into())
    }

    async fn credentials(&self) -> Result<Vec<StoredCredential>> {
        let world = self.enter("credentials")?;
        Ok(match self.role {
            AgentRole::Holder => world.wallet.clone(),
            _ => Vec::new(),
        })
    }

    async fn delete_credential(&self, referent: &str) -> Result<()> {
        let mut world = self.enter("delete_credential")?;
        let before = world.wallet.len();
        world.wallet.retain(|c| c.referent != referent);
        if world.wallet.len() == before {
            return Err(Error::agent(404, "Credential not found"));
        }
        Ok(())
    }

    async fn revoke(&self, request: &RevokeRequest) -> Result<()> {
        let mut world = self.enter("revoke")?;
        let target = (request.rev_reg_id.clone(), request.cred_rev_id.clone());
        if !world.issued.contains(&target) {
            return Err(Error::agent(
                400,
                format!("No issued credential {}:{}", target.0, target.1),
            ));
        }
        world.revoked.insert(target);
        Ok(())
    }

    async fn revocation_registries(&self, cred_def_id: &str) -> Result<Vec<String>> {
        let world = self.enter("revocation_registries")?;
        Ok(world
            .cred_defs
            .iter()
            .filter(|c| c.id == cred_def_id)
            .map(|c| revocation_registry(&c.id))
            .collect())
    }
}
