//! Proof request, presentation wait and verification.

use crate::agent::{is_true, AgentApi, PresExRecord};
use crate::connection::active_connection_id;
use crate::core::{epoch_seconds, Error, Result};
use crate::proof::request::PresentationRequestSpec;
use crate::proof::source::{PollingSource, PresentationSource, SourceEvent};
use crate::proof::state::PresentationStep;
use crate::retry::PollConfig;
use crate::state::{keys, WorkflowState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Classified result of a proof request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProofOutcome {
    AccessGranted,
    /// Presentation checked and found invalid (including revoked)
    AccessDenied { messages: Vec<String> },
    /// Never reached a terminal state
    Timeout { polls: u32 },
    /// Verifier dropped the record mid-wait
    RecordVanished,
}

impl ProofOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, ProofOutcome::AccessGranted)
    }

    /// Classify an agent's `verified` flag and diagnostics.
    pub fn from_verification(verified: Option<&serde_json::Value>, messages: Vec<String>) -> Self {
        if is_true(verified) {
            return ProofOutcome::AccessGranted;
        }
        let messages = if messages.is_empty() {
            vec![match verified {
                Some(value) => format!("verifier reported verified={}", value),
                None => "verifier reported no verification result".to_string(),
            }]
        } else {
            messages
        };
        ProofOutcome::AccessDenied { messages }
    }
}

impl std::fmt::Display for ProofOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProofOutcome::AccessGranted => write!(f, "ACCESS_GRANTED"),
            ProofOutcome::AccessDenied { .. } => write!(f, "ACCESS_DENIED"),
            ProofOutcome::Timeout { .. } => write!(f, "TIMEOUT"),
            ProofOutcome::RecordVanished => write!(f, "RECORD_VANISHED"),
        }
    }
}

/// Result of one proof run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofReport {
    pub pres_ex_id: String,
    pub outcome: ProofOutcome,
}

/// Requests a personhood proof from the holder and classifies the answer.
pub struct ProofOrchestrator {
    verifier: Arc<dyn AgentApi>,
    state: WorkflowState,
    request: PresentationRequestSpec,
}

impl ProofOrchestrator {
    pub fn new(verifier: Arc<dyn AgentApi>, state: WorkflowState) -> Self {
        Self {
            verifier,
            state,
            request: PresentationRequestSpec::default(),
        }
    }

    /// Use a different presentation request shape.
    pub fn with_request(mut self, request: PresentationRequestSpec) -> Self {
        self.request = request;
        self
    }

    /// Request a proof over the verifier connection recorded under
    /// `connection_alias`, for the credential definition in the state.
    pub async fn request_proof(&self, connection_alias: &str, poll: &PollConfig) -> Result<ProofReport> {
        let cred_def_id = self.state.require(keys::CRED_DEF_ID).await?;
        let connection_id = active_connection_id(self.verifier.as_ref(), connection_alias)
            .await?
            .ok_or_else(|| {
                Error::Precondition(format!("no active connection '{}'", connection_alias))
            })?;
        self.request_and_await_proof(&connection_id, &cred_def_id, poll)
            .await
    }

    /// Send the request and poll the verifier until a terminal state or
    /// the budget runs out.
    pub async fn request_and_await_proof(
        &self,
        connection_id: &str,
        cred_def_id: &str,
        poll: &PollConfig,
    ) -> Result<ProofReport> {
        let source = PollingSource::new(self.verifier.clone(), poll.clone());
        self.request_and_await_with(connection_id, cred_def_id, &source)
            .await
    }

    /// Same as [`Self::request_and_await_proof`] with a caller-supplied
    /// source of record updates.
    pub async fn request_and_await_with(
        &self,
        connection_id: &str,
        cred_def_id: &str,
        source: &dyn PresentationSource,
    ) -> Result<ProofReport> {
        let request = self
            .request
            .to_request(connection_id, cred_def_id, epoch_seconds());
        let record = self.verifier.send_proof_request(&request).await?;
        let pres_ex_id = record.pres_ex_id;
        info!(pres_ex_id = %pres_ex_id, "proof requested");

        let outcome = match source.await_terminal(&pres_ex_id).await? {
            SourceEvent::Terminal(record) => self.classify(record).await,
            SourceEvent::Vanished => ProofOutcome::RecordVanished,
            SourceEvent::Exhausted { polls } => ProofOutcome::Timeout { polls },
        };

        match &outcome {
            ProofOutcome::AccessGranted => info!(pres_ex_id = %pres_ex_id, "access granted"),
            ProofOutcome::AccessDenied { messages } => {
                warn!(pres_ex_id = %pres_ex_id, reasons = ?messages, "access denied")
            }
            other => warn!(pres_ex_id = %pres_ex_id, outcome = %other, "proof not completed"),
        }
        Ok(ProofReport {
            pres_ex_id,
            outcome,
        })
    }

    async fn classify(&self, record: PresExRecord) -> ProofOutcome {
        match PresentationStep::for_state(&record.state) {
            PresentationStep::Verify => {
                match self.verifier.verify_presentation(&record.pres_ex_id).await {
                    Ok(result) => {
                        ProofOutcome::from_verification(result.verified.as_ref(), result.messages())
                    }
                    Err(err) => {
                        warn!(pres_ex_id = %record.pres_ex_id, error = %err, "verification call failed");
                        ProofOutcome::AccessDenied {
                            messages: vec![format!("verification failed: {}", err)],
                        }
                    }
                }
            }
            PresentationStep::Classify => ProofOutcome::from_verification(
                record.verified.as_ref(),
                record.verified_msgs.unwrap_or_default(),
            ),
            PresentationStep::Abandoned => ProofOutcome::AccessDenied {
                messages: vec![record
                    .error_msg
                    .unwrap_or_else(|| "presentation abandoned".to_string())],
            },
            PresentationStep::Wait => ProofOutcome::Timeout { polls: 0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{FakeBehavior, FakeNetwork};
    use crate::agent::{PresExState, StoredCredential};
    use crate::core::AgentRole;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    const ALIAS: &str = "Connection_Bank_Bot";

    fn poll() -> PollConfig {
        PollConfig::new(Duration::from_secs(2), 20)
    }

    async fn setup(behavior: FakeBehavior) -> (FakeNetwork, ProofOrchestrator, StoredCredential) {
        let network = FakeNetwork::with_behavior(behavior);
        network.seed_connection(AgentRole::Verifier, ALIAS, AgentRole::Holder, "Connection_Bot_Bank");
        let (_, cred_def_id) = network.seed_cred_def();
        let credential = StoredCredential {
            referent: "cred-a".into(),
            schema_id: None,
            cred_def_id: Some(cred_def_id.clone()),
            rev_reg_id: Some("revreg-1".into()),
            cred_rev_id: Some("1".into()),
            attrs: Default::default(),
        };
        network.seed_wallet_credential(credential.clone());

        let state = WorkflowState::in_memory();
        state.set(keys::CRED_DEF_ID, &cred_def_id).await.unwrap();
        let orchestrator = ProofOrchestrator::new(network.agent(AgentRole::Verifier), state);
        (network, orchestrator, credential)
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(ProofOutcome::AccessGranted.to_string(), "ACCESS_GRANTED");
        assert_eq!(
            ProofOutcome::AccessDenied { messages: vec![] }.to_string(),
            "ACCESS_DENIED"
        );
        assert_eq!(ProofOutcome::Timeout { polls: 20 }.to_string(), "TIMEOUT");
    }

    #[test]
    fn test_classification_is_strict() {
        assert!(ProofOutcome::from_verification(Some(&json!("true")), vec![]).is_granted());
        assert!(ProofOutcome::from_verification(Some(&json!(true)), vec![]).is_granted());
        assert!(!ProofOutcome::from_verification(Some(&json!("false")), vec![]).is_granted());
        assert!(!ProofOutcome::from_verification(None, vec![]).is_granted());

        match ProofOutcome::from_verification(Some(&json!({"error": "x"})), vec![]) {
            ProofOutcome::AccessDenied { messages } => assert_eq!(messages.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_credential_is_granted() {
        let (network, orchestrator, _) = setup(FakeBehavior::default()).await;

        let report = orchestrator.request_proof(ALIAS, &poll()).await.unwrap();

        assert_eq!(report.outcome, ProofOutcome::AccessGranted);
        assert_eq!(network.calls(AgentRole::Verifier, "verify_presentation"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_presentation_is_awaited() {
        let (network, orchestrator, _) = setup(FakeBehavior {
            presentation_delay: 3,
            ..Default::default()
        })
        .await;
        let started = tokio::time::Instant::now();

        let report = orchestrator.request_proof(ALIAS, &poll()).await.unwrap();

        assert_eq!(report.outcome, ProofOutcome::AccessGranted);
        assert_eq!(network.calls(AgentRole::Verifier, "presentation_exchange"), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_revoked_credential_is_denied_with_messages() {
        let (network, orchestrator, credential) = setup(FakeBehavior {
            verified_as_string: false,
            ..Default::default()
        })
        .await;
        network
            .agent(AgentRole::Issuer)
            .revoke(&crate::agent::RevokeRequest {
                rev_reg_id: credential.rev_reg_id.clone().unwrap(),
                cred_rev_id: credential.cred_rev_id.clone().unwrap(),
                publish: true,
                notify: false,
            })
            .await
            .unwrap();

        let report = orchestrator.request_proof(ALIAS, &poll()).await.unwrap();

        match report.outcome {
            ProofOutcome::AccessDenied { messages } => {
                assert!(messages[0].contains("revoked"))
            }
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_verifier_times_out_after_max_polls() {
        let (network, orchestrator, _) = setup(FakeBehavior {
            verifier_stuck: true,
            ..Default::default()
        })
        .await;

        let report = orchestrator.request_proof(ALIAS, &poll()).await.unwrap();

        assert_eq!(report.outcome, ProofOutcome::Timeout { polls: 20 });
        assert_eq!(network.calls(AgentRole::Verifier, "presentation_exchange"), 20);
        assert_eq!(network.calls(AgentRole::Verifier, "verify_presentation"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_vanished_record() {
        let (_, orchestrator, _) = setup(FakeBehavior {
            presentation_vanishes: true,
            ..Default::default()
        })
        .await;

        let report = orchestrator.request_proof(ALIAS, &poll()).await.unwrap();
        assert_eq!(report.outcome, ProofOutcome::RecordVanished);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verify_fault_is_denied() {
        let (network, orchestrator, _) = setup(FakeBehavior::default()).await;
        network.fail_next(
            AgentRole::Verifier,
            "verify_presentation",
            Error::agent(500, "ledger unreachable"),
        );

        let report = orchestrator.request_proof(ALIAS, &poll()).await.unwrap();

        match report.outcome {
            ProofOutcome::AccessDenied { messages } => {
                assert!(messages[0].contains("ledger unreachable"))
            }
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_wallet_is_abandoned() {
        let network = FakeNetwork::new();
        network.seed_connection(AgentRole::Verifier, ALIAS, AgentRole::Holder, "Connection_Bot_Bank");
        let orchestrator =
            ProofOrchestrator::new(network.agent(AgentRole::Verifier), WorkflowState::in_memory());

        let report = orchestrator
            .request_and_await_proof("conn-x", "cd-unknown", &poll())
            .await
            .unwrap();

        assert!(matches!(report.outcome, ProofOutcome::AccessDenied { .. }));
    }

    #[tokio::test]
    async fn test_missing_cred_def_is_precondition() {
        let network = FakeNetwork::new();
        let orchestrator =
            ProofOrchestrator::new(network.agent(AgentRole::Verifier), WorkflowState::in_memory());

        let err = orchestrator.request_proof(ALIAS, &poll()).await.unwrap_err();

        assert!(matches!(err, Error::Precondition(_)));
        assert_eq!(network.total_calls(), 0);
    }

    struct PushedRecord(PresExRecord);

    #[async_trait]
    impl PresentationSource for PushedRecord {
        async fn await_terminal(&self, _pres_ex_id: &str) -> Result<SourceEvent> {
            Ok(SourceEvent::Terminal(self.0.clone()))
        }
    }

    #[tokio::test]
    async fn test_pushed_verified_record_is_classified() {
        let (network, orchestrator, _) = setup(FakeBehavior::default()).await;
        let pushed = PushedRecord(PresExRecord {
            pres_ex_id: "pushed".into(),
            state: PresExState::Done,
            connection_id: None,
            verified: Some(json!("true")),
            verified_msgs: None,
            error_msg: None,
        });

        let report = orchestrator
            .request_and_await_with("conn-1", "cd-1", &pushed)
            .await
            .unwrap();

        assert!(report.outcome.is_granted());
        assert_eq!(network.calls(AgentRole::Verifier, "presentation_exchange"), 0);
    }
}
