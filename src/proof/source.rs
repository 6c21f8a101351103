//! Where presentation record updates come from.
//!
//! [`PollingSource`] reads the verifier's record at a fixed interval. A
//! webhook-driven source can implement [`PresentationSource`] without the
//! orchestrator changing.

use crate::agent::{AgentApi, PresExRecord};
use crate::core::{Error, Result};
use crate::proof::state::PresentationStep;
use crate::retry::PollConfig;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// How waiting for a presentation ended.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceEvent {
    /// Record reached a terminal state
    Terminal(PresExRecord),
    /// Agent no longer knows the record
    Vanished,
    /// No terminal state within the budget
    Exhausted { polls: u32 },
}

/// Awaits a terminal state of one presentation exchange.
#[async_trait]
pub trait PresentationSource: Send + Sync {
    async fn await_terminal(&self, pres_ex_id: &str) -> Result<SourceEvent>;
}

/// Bounded polling of the verifier agent.
pub struct PollingSource {
    verifier: Arc<dyn AgentApi>,
    poll: PollConfig,
}

impl PollingSource {
    pub fn new(verifier: Arc<dyn AgentApi>, poll: PollConfig) -> Self {
        Self { verifier, poll }
    }
}

#[async_trait]
impl PresentationSource for PollingSource {
    /// Fetches the record at most `max_polls` times. A 404 ends the wait
    /// early, a protocol fault aborts it, and any other fault is logged
    /// and the next poll proceeds.
    async fn await_terminal(&self, pres_ex_id: &str) -> Result<SourceEvent> {
        for poll in 1..=self.poll.max_polls {
            self.poll.tick().await;

            match self.verifier.presentation_exchange(pres_ex_id).await {
                Ok(record) => {
                    debug!(poll, pres_ex_id, state = %record.state, "presentation record");
                    if PresentationStep::for_state(&record.state).is_terminal() {
                        return Ok(SourceEvent::Terminal(record));
                    }
                }
                Err(err) if err.is_not_found() => {
                    warn!(poll, pres_ex_id, "presentation record vanished");
                    return Ok(SourceEvent::Vanished);
                }
                Err(err @ Error::Protocol(_)) => return Err(err),
                Err(err) => {
                    warn!(poll, pres_ex_id, error = %err, "poll failed, continuing");
                }
            }
        }
        Ok(SourceEvent::Exhausted {
            polls: self.poll.max_polls,
        })
    }
}
