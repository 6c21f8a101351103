//! Verifier-side transition table of the proof handshake.

use crate::agent::PresExState;

/// What the orchestrator does with a presentation record in a given state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentationStep {
    /// Presentation arrived; run explicit verification
    Verify,
    /// Already verified by the agent; classify from the record
    Classify,
    /// Holder or verifier gave up
    Abandoned,
    /// Not terminal yet
    Wait,
}

impl PresentationStep {
    pub fn for_state(state: &PresExState) -> Self {
        match state {
            PresExState::PresentationReceived => PresentationStep::Verify,
            PresExState::Verified | PresExState::Done => PresentationStep::Classify,
            PresExState::Abandoned => PresentationStep::Abandoned,
            PresExState::RequestSent
            | PresExState::RequestReceived
            | PresExState::PresentationSent
            | PresExState::Unknown(_) => PresentationStep::Wait,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PresentationStep::Wait)
    }
}
