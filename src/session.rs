use log::debug;
use tokio::sync::mpsc;

use crate::error::PipelineError;
use crate::peer::ice::IceCandidateRelay;
use crate::peer::negotiator::Negotiator;
use crate::peer::types::{IceCandidate, SessionDescription, TrackInfo};
use crate::utils::random_id;

/// Which side of the offer/answer exchange this session plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Offerer,
}

/// Everything that reaches the session from outside the signaling socket.
#[derive(Debug)]
pub enum SessionEvent {
    NegotiationNeeded,
    OfferCreated(SessionDescription),
    OfferFailed(PipelineError),
    IceCandidateGathered(IceCandidate),
    TrackAdded(TrackInfo),
    Shutdown,
}

/// Posts events into the session mailbox. Cheap to clone and callable from
/// any thread; never blocks.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    fn post(&self, event: SessionEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!("session already finished, dropping {:?}", e.0);
        }
    }

    pub fn negotiation_needed(&self) {
        self.post(SessionEvent::NegotiationNeeded);
    }

    pub fn offer_created(&self, offer: SessionDescription) {
        self.post(SessionEvent::OfferCreated(offer));
    }

    pub fn offer_failed(&self, error: PipelineError) {
        self.post(SessionEvent::OfferFailed(error));
    }

    pub fn candidate_gathered(&self, candidate: IceCandidate) {
        self.post(SessionEvent::IceCandidateGathered(candidate));
    }

    pub fn track_added(&self, track: TrackInfo) {
        self.post(SessionEvent::TrackAdded(track));
    }

    /// Stops the receive loop; the session then releases channel and pipeline.
    pub fn shutdown(&self) {
        self.post(SessionEvent::Shutdown);
    }
}

/// Receiving end of the session's event queue.
pub struct Mailbox {
    handle: SessionHandle,
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Mailbox {
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Never yields `None`: the mailbox holds a sender of its own.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }
}

pub fn mailbox() -> (SessionHandle, Mailbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = SessionHandle { tx };
    (
        handle.clone(),
        Mailbox {
            handle,
            rx,
        },
    )
}

/// The negotiation context. Owned by exactly one task, the orchestrator's.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub role: Role,
    pub negotiator: Negotiator,
    pub relay: IceCandidateRelay,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: random_id(),
            role: Role::Offerer,
            negotiator: Negotiator::new(),
            relay: IceCandidateRelay::new(),
        }
    }

    /// Abandons the current negotiation together with its early candidates.
    pub fn reset(&mut self) -> usize {
        self.negotiator.reset();
        self.relay.discard_pending()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
