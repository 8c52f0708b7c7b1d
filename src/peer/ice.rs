use std::collections::VecDeque;
use std::fmt;

use log::debug;

use crate::error::SendError;
use crate::logger::dump_candidate;
use crate::peer::types::{IceCandidate, SignalingMessage};
use crate::signaling::SignalingSender;

/// Candidate type as advertised by the `typ` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Host,
    ServerReflexive,
    PeerReflexive,
    Relay,
    Unknown,
}

impl CandidateKind {
    pub fn of(candidate: &str) -> Self {
        let mut tokens = candidate.split_whitespace();
        while let Some(token) = tokens.next() {
            if token == "typ" {
                return match tokens.next() {
                    Some("host") => CandidateKind::Host,
                    Some("srflx") => CandidateKind::ServerReflexive,
                    Some("prflx") => CandidateKind::PeerReflexive,
                    Some("relay") => CandidateKind::Relay,
                    _ => CandidateKind::Unknown,
                };
            }
        }
        CandidateKind::Unknown
    }
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CandidateKind::Host => "host",
            CandidateKind::ServerReflexive => "srflx",
            CandidateKind::PeerReflexive => "prflx",
            CandidateKind::Relay => "relay",
            CandidateKind::Unknown => "unknown",
        })
    }
}

/// Trickle-ICE in both directions.
///
/// Outbound candidates go straight to the signaling channel in gathering
/// order. Inbound candidates that arrive before the remote description are
/// held back and released, in arrival order, by [`drain_pending`].
///
/// [`drain_pending`]: IceCandidateRelay::drain_pending
#[derive(Debug, Default)]
pub struct IceCandidateRelay {
    pending_remote: VecDeque<IceCandidate>,
    forwarded: u64,
    applied: u64,
}

impl IceCandidateRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends one locally gathered candidate. No retry on failure.
    pub fn forward(
        &mut self,
        candidate: &IceCandidate,
        sender: &SignalingSender,
    ) -> Result<(), SendError> {
        dump_candidate("LOCAL", candidate);
        sender.send(&SignalingMessage::Ice(candidate.clone()))?;
        self.forwarded += 1;
        Ok(())
    }

    /// Accepts one remote candidate. Returns it when it can be applied now,
    /// otherwise queues it until the remote description is set.
    pub fn receive(
        &mut self,
        candidate: IceCandidate,
        remote_description_set: bool,
    ) -> Option<IceCandidate> {
        dump_candidate("REMOTE", &candidate);
        if remote_description_set {
            self.applied += 1;
            Some(candidate)
        } else {
            debug!(
                "remote description not set yet, queuing candidate ({} pending)",
                self.pending_remote.len() + 1
            );
            self.pending_remote.push_back(candidate);
            None
        }
    }

    /// Releases every queued remote candidate in arrival order.
    pub fn drain_pending(&mut self) -> Vec<IceCandidate> {
        let candidates: Vec<_> = self.pending_remote.drain(..).collect();
        self.applied += candidates.len() as u64;
        candidates
    }

    /// Drops queued remote candidates of an abandoned negotiation.
    pub fn discard_pending(&mut self) -> usize {
        let dropped = self.pending_remote.len();
        self.pending_remote.clear();
        dropped
    }

    pub fn pending_len(&self) -> usize {
        self.pending_remote.len()
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    pub fn applied(&self) -> u64 {
        self.applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio_tungstenite::tungstenite::Message;

    fn cand(n: u32) -> IceCandidate {
        IceCandidate::new(
            format!("candidate:{n} 1 UDP 2130706431 10.0.0.{n} 5000{n} typ host"),
            0,
        )
    }

    #[test]
    fn candidate_kinds() {
        assert_eq!(CandidateKind::of(&cand(1).candidate), CandidateKind::Host);
        assert_eq!(
            CandidateKind::of("candidate:2 1 udp 1677729535 1.2.3.4 61000 typ srflx raddr 0.0.0.0 rport 0"),
            CandidateKind::ServerReflexive
        );
        assert_eq!(
            CandidateKind::of("candidate:3 1 udp 16777215 5.6.7.8 3478 typ relay"),
            CandidateKind::Relay
        );
        assert_eq!(CandidateKind::of("candidate:4"), CandidateKind::Unknown);
        assert_eq!(CandidateKind::of("candidate:5 typ"), CandidateKind::Unknown);
    }

    #[test]
    fn early_candidates_are_held_in_order() {
        let mut relay = IceCandidateRelay::new();
        for n in 1..=4 {
            assert!(relay.receive(cand(n), false).is_none());
        }
        assert_eq!(relay.pending_len(), 4);
        assert_eq!(relay.applied(), 0);

        let released = relay.drain_pending();
        assert_eq!(released, (1..=4).map(cand).collect::<Vec<_>>());
        assert_eq!(relay.pending_len(), 0);
        assert_eq!(relay.applied(), 4);
        assert!(relay.drain_pending().is_empty());
    }

    #[test]
    fn late_candidates_pass_through() {
        let mut relay = IceCandidateRelay::new();
        assert_eq!(relay.receive(cand(7), true), Some(cand(7)));
        assert_eq!(relay.pending_len(), 0);
        assert_eq!(relay.applied(), 1);
    }

    #[test]
    fn discard_forgets_queue() {
        let mut relay = IceCandidateRelay::new();
        relay.receive(cand(1), false);
        relay.receive(cand(2), false);
        assert_eq!(relay.discard_pending(), 2);
        assert!(relay.drain_pending().is_empty());
    }

    #[test]
    fn forward_sends_ice_frames_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = SignalingSender::new(tx);
        let mut relay = IceCandidateRelay::new();

        relay.forward(&cand(1), &sender).unwrap();
        relay.forward(&cand(2), &sender).unwrap();
        assert_eq!(relay.forwarded(), 2);

        for n in 1..=2 {
            match rx.try_recv().unwrap() {
                Message::Text(text) => {
                    assert_eq!(
                        SignalingMessage::parse(&text).unwrap(),
                        SignalingMessage::Ice(cand(n))
                    );
                }
                other => panic!("unexpected frame {:?}", other),
            }
        }
    }

    #[test]
    fn forward_reports_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sender = SignalingSender::new(tx);
        let mut relay = IceCandidateRelay::new();
        assert!(matches!(
            relay.forward(&cand(1), &sender),
            Err(SendError::Closed)
        ));
        assert_eq!(relay.forwarded(), 0);
    }
}
