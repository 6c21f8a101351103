//! Offer, request, issue and store between issuer and holder.

use crate::agent::{AgentApi, AgentSet, CredExRecord, CredExState};
use crate::connection::active_connection_id;
use crate::core::{Error, Result};
use crate::issuance::attributes::{CredentialAttributes, CredentialOffer};
use crate::issuance::state::HolderAction;
use crate::retry::{PollConfig, RetryOn, RetryPolicy};
use crate::state::{keys, WorkflowState};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// How an issuance run ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuanceOutcome {
    /// Holder stored the credential in this run
    Stored,
    /// Holder's record was already done
    AlreadyComplete,
    /// No terminal state within the poll budget
    TimedOut,
}

/// Result of one issuance run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceReport {
    /// Holder-side exchange id, or the issuer's when the holder never saw it
    pub cred_ex_id: String,
    pub outcome: IssuanceOutcome,
    pub credentials_before: usize,
    pub credentials_after: usize,
}

impl IssuanceReport {
    pub fn is_success(&self) -> bool {
        matches!(
            self.outcome,
            IssuanceOutcome::Stored | IssuanceOutcome::AlreadyComplete
        )
    }

    /// Credentials the holder gained during the run.
    pub fn credentials_gained(&self) -> i64 {
        self.credentials_after as i64 - self.credentials_before as i64
    }
}

/// Drives the issuance handshake by polling both agents' records.
pub struct IssuanceOrchestrator {
    agents: AgentSet,
    state: WorkflowState,
    retry: RetryPolicy,
    poll: PollConfig,
}

impl IssuanceOrchestrator {
    /// Offers and record reads retry only network and 5xx faults.
    pub fn new(agents: AgentSet, state: WorkflowState, retry: RetryPolicy, poll: PollConfig) -> Self {
        Self {
            agents,
            state,
            retry: retry.retry_on(RetryOn::Transient),
            poll,
        }
    }

    /// Issue a credential over the issuer connection recorded under
    /// `connection_alias`.
    ///
    /// Attributes are validated before any agent is contacted.
    pub async fn issue(
        &self,
        connection_alias: &str,
        attributes: &CredentialAttributes,
    ) -> Result<IssuanceReport> {
        attributes.validate()?;

        let cred_def_id = self.state.require(keys::CRED_DEF_ID).await?;
        let connection_id = active_connection_id(self.agents.issuer.as_ref(), connection_alias)
            .await?
            .ok_or_else(|| {
                Error::Precondition(format!("no active connection '{}'", connection_alias))
            })?;

        let credentials_before = self.holder_credential_count().await?;
        let offer = CredentialOffer::new(&connection_id, attributes.clone(), &cred_def_id)?;
        let issuer_record = self.send_offer(&offer).await?;
        info!(
            cred_ex_id = %issuer_record.cred_ex_id,
            correlation_id = %offer.correlation_id,
            "offer sent"
        );

        let (cred_ex_id, outcome) = self.drive_holder(&issuer_record).await?;
        let credentials_after = self.holder_credential_count().await?;

        let report = IssuanceReport {
            cred_ex_id,
            outcome,
            credentials_before,
            credentials_after,
        };
        info!(
            outcome = ?report.outcome,
            before = report.credentials_before,
            after = report.credentials_after,
            "issuance finished"
        );
        Ok(report)
    }

    /// Send the offer under the retry policy.
    ///
    /// Only network and 5xx faults are retried. A timeout or 5xx that
    /// happens after the agent accepted the offer still produces a second
    /// offer on retry; the correlation id in the offer comment lets the
    /// duplicate be traced on the agent side.
    pub async fn send_offer(&self, offer: &CredentialOffer) -> Result<CredExRecord> {
        let request = offer.to_request();
        self.retry
            .run("send_offer", || self.agents.issuer.send_offer(&request))
            .await
    }

    async fn drive_holder(&self, issuer_record: &CredExRecord) -> Result<(String, IssuanceOutcome)> {
        let holder = self.agents.holder.as_ref();
        let mut reconciled = false;
        let mut last_seen = issuer_record.cred_ex_id.clone();

        for poll in 1..=self.poll.max_polls {
            self.poll.tick().await;

            let mut record = match self.holder_record(issuer_record).await? {
                Some(record) => record,
                None => {
                    debug!(poll, "holder has no record for this exchange yet");
                    continue;
                }
            };
            let mut requested = false;

            loop {
                last_seen = record.cred_ex_id.clone();
                debug!(poll, cred_ex_id = %record.cred_ex_id, state = %record.state, "holder record");

                match HolderAction::for_state(&record.state, reconciled) {
                    HolderAction::SendRequest if !requested => {
                        holder.send_request(&record.cred_ex_id).await?;
                        debug!(cred_ex_id = %record.cred_ex_id, "holder sent request");
                        requested = true;
                        let cred_ex_id = record.cred_ex_id.clone();
                        record = self.refetch(&cred_ex_id).await?;
                        continue;
                    }
                    HolderAction::SendRequest | HolderAction::Wait => {}
                    HolderAction::Store => {
                        holder
                            .store_credential(&record.cred_ex_id, &record.cred_ex_id)
                            .await?;
                        info!(cred_ex_id = %record.cred_ex_id, "credential stored");
                        return Ok((record.cred_ex_id, IssuanceOutcome::Stored));
                    }
                    HolderAction::ForceIssue => {
                        warn!(cred_ex_id = %record.cred_ex_id, "holder stalled in request-sent, forcing issuer");
                        self.force_issue(issuer_record, &record).await?;
                        reconciled = true;
                    }
                    HolderAction::AlreadyComplete => {
                        info!(cred_ex_id = %record.cred_ex_id, "exchange already complete");
                        return Ok((record.cred_ex_id, IssuanceOutcome::AlreadyComplete));
                    }
                    HolderAction::Unrecognized(state) => {
                        return Err(Error::UnrecognizedState {
                            kind: "credential exchange",
                            state,
                        });
                    }
                }
                break;
            }
        }

        warn!(polls = self.poll.max_polls, cred_ex_id = %last_seen, "issuance timed out");
        Ok((last_seen, IssuanceOutcome::TimedOut))
    }

    /// Holder's view of one exchange after acting on it.
    async fn refetch(&self, cred_ex_id: &str) -> Result<CredExRecord> {
        self.retry
            .run("holder_record", || {
                self.agents.holder.credential_exchange(cred_ex_id)
            })
            .await
    }

    /// Holder record of this exchange, matched by thread id. Without a
    /// thread id the most recent record is taken.
    async fn holder_record(&self, issuer_record: &CredExRecord) -> Result<Option<CredExRecord>> {
        let records = self
            .retry
            .run("holder_records", || {
                self.agents.holder.credential_exchanges(None)
            })
            .await?;
        Ok(pick_record(records, issuer_record.thread_id.as_deref()))
    }

    /// Compensating issue for a holder stuck in request-sent.
    async fn force_issue(&self, issuer_record: &CredExRecord, holder_record: &CredExRecord) -> Result<()> {
        let issuer: &dyn AgentApi = self.agents.issuer.as_ref();
        let wanted = CredExState::RequestReceived;
        let pending = self
            .retry
            .run("issuer_pending_records", || {
                issuer.credential_exchanges(Some(&wanted))
            })
            .await?;
        let thread_id = holder_record
            .thread_id
            .as_deref()
            .or(issuer_record.thread_id.as_deref());

        match pick_record(pending, thread_id) {
            Some(target) => {
                issuer.issue_credential(&target.cred_ex_id, "force").await?;
                info!(cred_ex_id = %target.cred_ex_id, "issuer issued credential");
            }
            None => debug!("issuer has no request-received record yet"),
        }
        Ok(())
    }

    async fn holder_credential_count(&self) -> Result<usize> {
        let credentials = self
            .retry
            .run("holder_credentials", || self.agents.holder.credentials())
            .await?;
        Ok(credentials.len())
    }
}

/// A known thread id never falls back to another exchange's record.
fn pick_record(records: Vec<CredExRecord>, thread_id: Option<&str>) -> Option<CredExRecord> {
    match thread_id {
        Some(thread_id) => records
            .into_iter()
            .rev()
            .find(|r| r.thread_id.as_deref() == Some(thread_id)),
        None => records.into_iter().last(),
    }
}
