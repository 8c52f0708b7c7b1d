//! Top-level session driver.
//!
//! A single task owns the [`Session`] and serializes the two event sources:
//! inbound signaling frames and the session mailbox (pipeline callbacks,
//! offer completions, shutdown). No other code touches negotiation state, so
//! no transition can interleave with another.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use log::{debug, error, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::error::{NegotiationError, SessionError};
use crate::logger::dump_sdp;
use crate::peer::pipeline::MediaPipeline;
use crate::peer::types::{IceCandidate, SdpPayload, SessionDescription, SignalingMessage};
use crate::session::{Mailbox, Session, SessionEvent, SessionHandle};
use crate::signaling::{Connection, Inbound, SignalingSender};

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Upper bound on `AwaitingAnswer`; `None` waits indefinitely.
    pub answer_timeout: Option<Duration>,
}

enum Flow {
    Continue,
    Stop,
}

pub struct SessionOrchestrator {
    session: Session,
    sender: SignalingSender,
    inbound: Inbound,
    writer: Option<JoinHandle<()>>,
    pipeline: Arc<dyn MediaPipeline>,
    mailbox: Mailbox,
    handle: SessionHandle,
    options: SessionOptions,
    answer_deadline: Option<Instant>,
}

impl SessionOrchestrator {
    pub fn new(
        connection: Connection,
        pipeline: Arc<dyn MediaPipeline>,
        mailbox: Mailbox,
        options: SessionOptions,
    ) -> Self {
        let (sender, inbound, writer) = connection.into_parts();
        let handle = mailbox.handle();
        Self {
            session: Session::new(),
            sender,
            inbound,
            writer,
            pipeline,
            mailbox,
            handle,
            options,
            answer_deadline: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Runs until the server closes the connection (`Ok`), a shutdown is
    /// requested (`Ok`), or a fatal condition occurs (`Err`). Channel and
    /// pipeline are released on every path.
    pub async fn run(mut self) -> Result<(), SessionError> {
        info!(
            "session {} started as {:?}",
            self.session.id, self.session.role
        );
        let result = self.drive().await;
        match &result {
            Ok(()) => info!("session {} finished", self.session.id),
            Err(e) => error!("session {} failed: {}", self.session.id, e),
        }
        self.teardown().await;
        result
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        loop {
            let deadline = self.answer_deadline;
            tokio::select! {
                frame = self.inbound.next() => match frame {
                    None => {
                        info!("signaling connection closed");
                        return Ok(());
                    }
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(text)) => self.handle_frame(&text)?,
                },
                Some(event) = self.mailbox.recv() => {
                    if let Flow::Stop = self.handle_event(event) {
                        info!("shutdown requested");
                        return Ok(());
                    }
                }
                _ = async {
                    match deadline {
                        Some(at) => sleep_until(at).await,
                        None => pending::<()>().await,
                    }
                } => {
                    let waited = self.options.answer_timeout.unwrap_or_default();
                    return Err(SessionError::AnswerTimeout(waited));
                }
            }
        }
    }

    fn handle_frame(&mut self, text: &str) -> Result<(), SessionError> {
        match SignalingMessage::parse(text) {
            Ok(SignalingMessage::Error(reason)) => {
                error!("{}", reason);
                Err(SessionError::Remote(reason))
            }
            Ok(SignalingMessage::Sdp(payload)) => {
                self.handle_remote_sdp(payload);
                Ok(())
            }
            Ok(SignalingMessage::Ice(candidate)) => {
                self.handle_remote_candidate(candidate);
                Ok(())
            }
            Err(e) => {
                warn!("ignoring inbound frame: {}", e);
                Ok(())
            }
        }
    }

    fn handle_remote_sdp(&mut self, payload: SdpPayload) {
        match self.session.negotiator.accept_answer(payload) {
            Ok(answer) => {
                dump_sdp("Received", &answer);
                self.answer_deadline = None;
                self.pipeline.set_remote_description(answer);

                let pending = self.session.relay.drain_pending();
                if !pending.is_empty() {
                    debug!("applying {} queued remote candidates", pending.len());
                }
                for candidate in pending {
                    self.pipeline.add_ice_candidate(candidate);
                }
            }
            Err(e @ NegotiationError::SdpParse(_)) => {
                error!("{}; negotiation reset", e);
                self.answer_deadline = None;
                let dropped = self.session.reset();
                if dropped > 0 {
                    debug!("dropped {} queued remote candidates", dropped);
                }
                // the pipeline still holds the old local offer and will not
                // ask for negotiation again, so restart from here
                if self.session.negotiator.request_offer() {
                    info!("Renegotiating, creating a fresh offer...");
                    self.spawn_create_offer();
                }
            }
            Err(e) => warn!("{}", e),
        }
    }

    fn handle_remote_candidate(&mut self, candidate: IceCandidate) {
        let ready = self.session.negotiator.remote_description_set();
        if let Some(candidate) = self.session.relay.receive(candidate, ready) {
            self.pipeline.add_ice_candidate(candidate);
        }
    }

    fn handle_event(&mut self, event: SessionEvent) -> Flow {
        match event {
            SessionEvent::NegotiationNeeded => {
                if self.session.negotiator.request_offer() {
                    info!("Negotiation needed, creating offer...");
                    self.spawn_create_offer();
                }
            }
            SessionEvent::OfferCreated(offer) => {
                if let Err(e) = self.publish_offer(offer) {
                    warn!("discarding offer: {}", e);
                }
            }
            SessionEvent::OfferFailed(e) => {
                error!("offer creation failed: {}", e);
                self.session.negotiator.offer_failed();
            }
            SessionEvent::IceCandidateGathered(candidate) => {
                if let Err(e) = self.session.relay.forward(&candidate, &self.sender) {
                    warn!("Failed to send ICE candidate: {}", e);
                }
            }
            SessionEvent::TrackAdded(track) => {
                info!(
                    "remote {} track {} (stream {}) added",
                    track.kind, track.id, track.stream_id
                );
            }
            SessionEvent::Shutdown => return Flow::Stop,
        }
        Flow::Continue
    }

    /// Offer creation runs on its own task; completion comes back through the
    /// mailbox like any other pipeline event.
    fn spawn_create_offer(&self) {
        let pipeline = self.pipeline.clone();
        let handle = self.handle.clone();
        tokio::spawn(async move {
            match pipeline.create_offer().await {
                Ok(offer) => handle.offer_created(offer),
                Err(e) => handle.offer_failed(e),
            }
        });
    }

    fn publish_offer(&mut self, offer: SessionDescription) -> Result<(), NegotiationError> {
        let negotiator = &mut self.session.negotiator;
        let offer = negotiator.offer_created(offer)?;
        info!("Offer created, setting local description...");

        self.pipeline.set_local_description(offer.clone());
        let message = negotiator.local_description_set()?;

        dump_sdp("Sending", &offer);
        if let Err(e) = self.sender.send(&message) {
            warn!("Failed to send SDP offer: {}", e);
        }
        negotiator.offer_sent()?;

        self.answer_deadline = self.options.answer_timeout.map(|t| Instant::now() + t);
        Ok(())
    }

    async fn teardown(&mut self) {
        self.answer_deadline = None;
        self.sender.close();
        if let Some(writer) = self.writer.take() {
            if tokio::time::timeout(Duration::from_secs(1), writer).await.is_err() {
                debug!("signaling writer did not stop in time");
            }
        }
        self.pipeline.close().await;
    }
}
