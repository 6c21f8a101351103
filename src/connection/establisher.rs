//! Out-of-band connection establishment between two agents.

use crate::agent::{AgentApi, ConnectionRecord, InvitationRequest};
use crate::core::{AgentRole, Error, Result};
use crate::retry::PollConfig;
use crate::state::{keys, WorkflowState};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Aliases each side uses for one pairwise connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionPair {
    /// Alias under which the inviter records the connection
    pub inviter_alias: String,
    /// Alias under which the invitee records the connection
    pub invitee_alias: String,
}

impl ConnectionPair {
    pub fn new(inviter_alias: &str, invitee_alias: &str) -> Self {
        Self {
            inviter_alias: inviter_alias.to_string(),
            invitee_alias: invitee_alias.to_string(),
        }
    }

    /// Issuer (government) to holder (bot).
    pub fn issuer_holder() -> Self {
        Self::new("Connection_Gov_Bot", "Connection_Bot_Gov")
    }

    /// Verifier (bank) to holder (bot).
    pub fn verifier_holder() -> Self {
        Self::new("Connection_Bank_Bot", "Connection_Bot_Bank")
    }
}

/// A connection as seen by one agent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRef {
    pub role: AgentRole,
    pub alias: String,
    pub connection_id: String,
    pub state: String,
}

impl ConnectionRef {
    fn from_record(role: AgentRole, alias: &str, record: ConnectionRecord) -> Self {
        Self {
            role,
            alias: alias.to_string(),
            connection_id: record.connection_id,
            state: record.state.unwrap_or_default(),
        }
    }
}

/// First active connection `agent` holds under `alias`.
pub async fn active_connection(agent: &dyn AgentApi, alias: &str) -> Result<Option<ConnectionRef>> {
    let records = agent.connections(alias, Some("active")).await?;
    Ok(records
        .into_iter()
        .find(|r| r.is_active())
        .map(|r| ConnectionRef::from_record(agent.role(), alias, r)))
}

/// Id of the first active connection `agent` holds under `alias`.
pub async fn active_connection_id(agent: &dyn AgentApi, alias: &str) -> Result<Option<String>> {
    Ok(active_connection(agent, alias)
        .await?
        .map(|c| c.connection_id))
}

/// Drives the invitation handshake and records the resulting ids.
pub struct ConnectionEstablisher {
    state: WorkflowState,
    poll: PollConfig,
}

impl ConnectionEstablisher {
    pub fn new(state: WorkflowState, poll: PollConfig) -> Self {
        Self { state, poll }
    }

    /// Connect `inviter` to `invitee` and wait until the inviter reports
    /// the connection active.
    ///
    /// Both sides' connection ids are persisted under their aliases. The
    /// invitee id is taken from its active connection if it already has
    /// one, otherwise from the out-of-band record.
    pub async fn connect(
        &self,
        inviter: &dyn AgentApi,
        invitee: &dyn AgentApi,
        pair: &ConnectionPair,
    ) -> Result<ConnectionRef> {
        let invitation = inviter
            .create_invitation(&InvitationRequest::didexchange(&pair.inviter_alias))
            .await?;
        debug!(
            inviter = %inviter.role(),
            oob_id = ?invitation.oob_id,
            "invitation created"
        );

        let oob = invitee
            .receive_invitation(&invitation.invitation, &pair.invitee_alias)
            .await?;

        let connection = self.await_active(inviter, &pair.inviter_alias).await?;
        self.state
            .set(&keys::connection(&pair.inviter_alias), &connection.connection_id)
            .await?;

        let invitee_id = match active_connection_id(invitee, &pair.invitee_alias).await? {
            Some(id) => Some(id),
            None => oob.connection_id,
        };
        if let Some(id) = invitee_id {
            self.state
                .set(&keys::connection(&pair.invitee_alias), &id)
                .await?;
        }

        info!(
            inviter = %inviter.role(),
            invitee = %invitee.role(),
            alias = %pair.inviter_alias,
            connection_id = %connection.connection_id,
            "connection established"
        );
        Ok(connection)
    }

    async fn await_active(&self, agent: &dyn AgentApi, alias: &str) -> Result<ConnectionRef> {
        for poll in 1..=self.poll.max_polls {
            if let Some(connection) = active_connection(agent, alias).await? {
                return Ok(connection);
            }
            debug!(alias, poll, "connection not active yet");
            if poll < self.poll.max_polls {
                self.poll.tick().await;
            }
        }
        Err(Error::Timeout {
            what: format!("connection '{}'", alias),
            polls: self.poll.max_polls,
        })
    }
}
