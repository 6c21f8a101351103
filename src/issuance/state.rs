//! Holder-side transition table of the issuance handshake.

use crate::agent::CredExState;

/// What the orchestrator does next, given the holder's record state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HolderAction {
    /// Holder accepts the offer
    SendRequest,
    /// Holder stores the received credential
    Store,
    /// Holder is stuck waiting on the issuer; issue explicitly
    ForceIssue,
    /// Exchange already finished
    AlreadyComplete,
    /// In flight; poll again
    Wait,
    /// Not part of the handshake
    Unrecognized(String),
}

impl HolderAction {
    /// Transition for `state`. `reconciled` is set once the issuer has
    /// been forced to issue, after which a stalled holder is only polled.
    pub fn for_state(state: &CredExState, reconciled: bool) -> Self {
        match state {
            CredExState::OfferReceived => HolderAction::SendRequest,
            CredExState::CredentialReceived => HolderAction::Store,
            CredExState::RequestSent if reconciled => HolderAction::Wait,
            CredExState::RequestSent => HolderAction::ForceIssue,
            CredExState::Done => HolderAction::AlreadyComplete,
            CredExState::OfferSent
            | CredExState::RequestReceived
            | CredExState::CredentialIssued => HolderAction::Wait,
            CredExState::Unknown(other) => HolderAction::Unrecognized(other.clone()),
        }
    }
}
