use std::fmt;

// ========== NEGOTIATION STATE ==========

/// Offer/answer progress of the single session.
///
/// `Idle → OfferRequested → OfferCreated → LocalDescriptionSet → AwaitingAnswer
/// → RemoteDescriptionSet`. Only a malformed answer or a failed offer moves the
/// machine backwards, and then always to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegotiationState {
    #[default]
    Idle,
    OfferRequested,
    OfferCreated,
    LocalDescriptionSet,
    AwaitingAnswer,
    RemoteDescriptionSet,
}

impl NegotiationState {
    /// An offer exists that has not been answered yet.
    pub fn has_outstanding_offer(&self) -> bool {
        matches!(
            self,
            NegotiationState::OfferRequested
                | NegotiationState::OfferCreated
                | NegotiationState::LocalDescriptionSet
                | NegotiationState::AwaitingAnswer
        )
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ========== CONSTANTS ==========

/// Default rendezvous server
pub const DEFAULT_SIGNALING_SERVER: &str = "ws://0.0.0.0:8765";

/// Default public STUN server
pub const DEFAULT_STUN_SERVER: &str = "stun://stun.l.google.com:19302";

/// Default wait for the remote answer before giving up on the session
pub const DEFAULT_ANSWER_TIMEOUT_SECS: u64 = 30;
