use log::{debug, info, warn};

use crate::error::NegotiationError;
use crate::peer::state::NegotiationState;
use crate::peer::types::{SdpPayload, SdpType, SessionDescription, SignalingMessage};

/// Offerer-side SDP exchange.
///
/// Pure state machine: it never talks to the pipeline or the socket itself.
/// The orchestrator asks it whether a step is legal, performs the side effect,
/// and then records the step here. Pipeline commands are fire-and-forget, so a
/// recorded step means "issued", not "acknowledged".
#[derive(Debug, Default)]
pub struct Negotiator {
    state: NegotiationState,
    local: Option<SessionDescription>,
    remote: Option<SessionDescription>,
}

impl Negotiator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn local_description(&self) -> Option<&SessionDescription> {
        self.local.as_ref()
    }

    pub fn remote_description(&self) -> Option<&SessionDescription> {
        self.remote.as_ref()
    }

    pub fn remote_description_set(&self) -> bool {
        self.state == NegotiationState::RemoteDescriptionSet
    }

    /// "Negotiation needed". Returns `true` when the caller must ask the
    /// pipeline for an offer; any trigger outside `Idle` is swallowed so that
    /// two offers never overlap.
    pub fn request_offer(&mut self) -> bool {
        if self.state != NegotiationState::Idle {
            debug!(
                "negotiation-needed ignored in state {} (offer already in progress)",
                self.state
            );
            return false;
        }
        self.enter(NegotiationState::OfferRequested);
        true
    }

    /// Offer creation completed. Returns the offer the pipeline must adopt as
    /// its local description.
    pub fn offer_created(
        &mut self,
        offer: SessionDescription,
    ) -> Result<SessionDescription, NegotiationError> {
        self.expect(NegotiationState::OfferRequested, "offer created")?;
        if offer.sdp_type() != SdpType::Offer {
            self.reset();
            return Err(NegotiationError::ProtocolViolation(format!(
                "pipeline produced an {} while an offer was requested",
                offer.sdp_type()
            )));
        }
        self.local = Some(offer.clone());
        self.enter(NegotiationState::OfferCreated);
        Ok(offer)
    }

    /// Offer creation failed inside the pipeline.
    pub fn offer_failed(&mut self) {
        if self.state == NegotiationState::OfferRequested {
            self.reset();
        }
    }

    /// `set_local_description` was issued. Returns the wire message carrying
    /// the offer.
    pub fn local_description_set(&mut self) -> Result<SignalingMessage, NegotiationError> {
        self.expect(NegotiationState::OfferCreated, "local description set")?;
        let offer = self.local.as_ref().ok_or_else(|| {
            NegotiationError::ProtocolViolation("no local offer recorded".to_string())
        })?;
        let message = SignalingMessage::offer(offer);
        self.enter(NegotiationState::LocalDescriptionSet);
        Ok(message)
    }

    /// The offer was handed to the signaling channel.
    pub fn offer_sent(&mut self) -> Result<(), NegotiationError> {
        self.expect(NegotiationState::LocalDescriptionSet, "offer sent")?;
        self.enter(NegotiationState::AwaitingAnswer);
        Ok(())
    }

    /// Handles an inbound `{"sdp": ...}` body. On success returns the parsed
    /// answer the pipeline must adopt as remote description.
    ///
    /// Out-of-state answers and non-answer types are protocol violations and
    /// leave the state untouched. Malformed SDP resets the negotiation.
    pub fn accept_answer(
        &mut self,
        payload: SdpPayload,
    ) -> Result<SessionDescription, NegotiationError> {
        self.expect(NegotiationState::AwaitingAnswer, "answer received")?;
        if payload.sdp_type != SdpType::Answer.as_str() {
            return Err(NegotiationError::ProtocolViolation(format!(
                "expected sdp type 'answer', got '{}'",
                payload.sdp_type
            )));
        }
        match SessionDescription::parse(SdpType::Answer, payload.sdp) {
            Ok(answer) => {
                self.remote = Some(answer.clone());
                self.enter(NegotiationState::RemoteDescriptionSet);
                Ok(answer)
            }
            Err(e) => {
                warn!("discarding negotiation after malformed answer");
                self.reset();
                Err(e)
            }
        }
    }

    /// Back to `Idle`, forgetting both descriptions.
    pub fn reset(&mut self) {
        self.local = None;
        self.remote = None;
        self.enter(NegotiationState::Idle);
    }

    fn expect(&self, expected: NegotiationState, step: &str) -> Result<(), NegotiationError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(NegotiationError::ProtocolViolation(format!(
                "{} while {} (expected {})",
                step, self.state, expected
            )))
        }
    }

    fn enter(&mut self, next: NegotiationState) {
        if self.state != next {
            info!("negotiation: {} -> {}", self.state, next);
            self.state = next;
        }
    }
}
