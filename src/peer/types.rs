use std::fmt;
use std::io::Cursor;

use serde::{Deserialize, Serialize};
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;

use crate::error::NegotiationError;

/// Prefix of the rendezvous server's terminal error frames.
pub const ERROR_PREFIX: &str = "ERROR";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

impl SdpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SdpType::Offer => "offer",
            SdpType::Answer => "answer",
        }
    }
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SDP text tagged with its role in the offer/answer exchange.
///
/// Immutable once built: the pipeline produces it, the negotiator transmits or
/// applies it, nothing edits it in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    sdp_type: SdpType,
    sdp: String,
}

impl SessionDescription {
    /// Wraps SDP produced by the local pipeline without re-parsing it.
    pub fn new(sdp_type: SdpType, sdp: impl Into<String>) -> Self {
        Self {
            sdp_type,
            sdp: sdp.into(),
        }
    }

    /// Parses SDP text received from the remote peer.
    pub fn parse(sdp_type: SdpType, sdp: impl Into<String>) -> Result<Self, NegotiationError> {
        let sdp = sdp.into();
        let mut reader = Cursor::new(sdp.as_bytes());
        webrtc::sdp::description::session::SessionDescription::unmarshal(&mut reader)
            .map_err(|e| NegotiationError::SdpParse(e.to_string()))?;
        Ok(Self { sdp_type, sdp })
    }

    pub fn sdp_type(&self) -> SdpType {
        self.sdp_type
    }

    pub fn as_text(&self) -> &str {
        &self.sdp
    }

    pub fn into_text(self) -> String {
        self.sdp
    }
}

/// ICE candidate as carried on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_mline_index: u16,
    #[serde(rename = "sdpMid", default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>, sdp_mline_index: u16) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mline_index,
            sdp_mid: None,
        }
    }
}

impl From<RTCIceCandidateInit> for IceCandidate {
    fn from(init: RTCIceCandidateInit) -> Self {
        Self {
            candidate: init.candidate,
            sdp_mline_index: init.sdp_mline_index.unwrap_or(0),
            sdp_mid: init.sdp_mid,
        }
    }
}

impl From<IceCandidate> for RTCIceCandidateInit {
    fn from(candidate: IceCandidate) -> Self {
        RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: Some(candidate.sdp_mline_index),
            username_fragment: None,
        }
    }
}

/// Body of an `{"sdp": ...}` message. The type stays a string so that an
/// unexpected value can be reported precisely instead of failing the decode.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SdpPayload {
    #[serde(rename = "type")]
    pub sdp_type: String,
    pub sdp: String,
}

/// Signaling envelope. Exactly one variant per frame:
/// `{"sdp": {...}}`, `{"ice": {...}}` or `{"error": "..."}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SignalingMessage {
    Sdp(SdpPayload),
    Ice(IceCandidate),
    Error(String),
}

impl SignalingMessage {
    pub fn offer(description: &SessionDescription) -> Self {
        SignalingMessage::Sdp(SdpPayload {
            sdp_type: description.sdp_type().as_str().to_string(),
            sdp: description.as_text().to_string(),
        })
    }

    /// Classifies one inbound text frame. Plain-text frames starting with
    /// `ERROR` are the server's error form and are not JSON.
    pub fn parse(text: &str) -> Result<Self, NegotiationError> {
        if text.starts_with(ERROR_PREFIX) {
            return Ok(SignalingMessage::Error(text.to_string()));
        }
        serde_json::from_str(text).map_err(|e| {
            NegotiationError::ProtocolViolation(format!("undecodable signaling message: {}", e))
        })
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Remote media track announced by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub id: String,
    pub stream_id: String,
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SDP: &str = "v=0\r\no=- 4215 0 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";

    #[test]
    fn offer_wire_format() {
        let offer = SessionDescription::new(SdpType::Offer, SDP);
        let json = SignalingMessage::offer(&offer).to_text().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["sdp"]["type"], "offer");
        assert_eq!(value["sdp"]["sdp"], SDP);
        assert_eq!(value.as_object().unwrap().len(), 1);
    }

    #[test]
    fn offer_text_survives_the_wire() {
        let offer = SessionDescription::new(SdpType::Offer, SDP);
        let json = SignalingMessage::offer(&offer).to_text().unwrap();
        match SignalingMessage::parse(&json).unwrap() {
            SignalingMessage::Sdp(payload) => {
                assert_eq!(payload.sdp_type, "offer");
                assert_eq!(payload.sdp.as_bytes(), offer.as_text().as_bytes());
            }
            other => panic!("expected sdp message, got {:?}", other),
        }
    }

    #[test]
    fn candidate_wire_format() {
        let json = r#"{"ice":{"candidate":"candidate:1 1 UDP 2130706431 192.168.1.4 50000 typ host","sdpMLineIndex":0}}"#;
        let msg = SignalingMessage::parse(json).unwrap();
        assert_eq!(
            msg,
            SignalingMessage::Ice(IceCandidate::new(
                "candidate:1 1 UDP 2130706431 192.168.1.4 50000 typ host",
                0
            ))
        );
        // sdpMid is omitted when absent
        assert_eq!(msg.to_text().unwrap(), json);
    }

    #[test]
    fn candidate_keeps_sdp_mid() {
        let json = r#"{"ice":{"candidate":"candidate:2","sdpMLineIndex":1,"sdpMid":"video0"}}"#;
        match SignalingMessage::parse(json).unwrap() {
            SignalingMessage::Ice(c) => {
                assert_eq!(c.sdp_mline_index, 1);
                assert_eq!(c.sdp_mid.as_deref(), Some("video0"));
            }
            other => panic!("expected ice message, got {:?}", other),
        }
    }

    #[test]
    fn error_prefix_is_not_json() {
        let msg = SignalingMessage::parse("ERROR peer 42 not found").unwrap();
        assert_eq!(msg, SignalingMessage::Error("ERROR peer 42 not found".into()));

        let msg = SignalingMessage::parse(r#"{"error":"room closed"}"#).unwrap();
        assert_eq!(msg, SignalingMessage::Error("room closed".into()));
    }

    #[test]
    fn garbage_is_a_protocol_violation() {
        for text in ["HELLO", "{}", r#"{"sdp":{"type":"answer"}}"#, r#"{"bye":1}"#] {
            assert!(matches!(
                SignalingMessage::parse(text),
                Err(NegotiationError::ProtocolViolation(_))
            ));
        }
    }

    #[test]
    fn parse_rejects_malformed_sdp() {
        assert!(SessionDescription::parse(SdpType::Answer, SDP).is_ok());
        assert!(matches!(
            SessionDescription::parse(SdpType::Answer, "not sdp at all"),
            Err(NegotiationError::SdpParse(_))
        ));
    }

    #[test]
    fn candidate_init_conversion() {
        let init = RTCIceCandidateInit {
            candidate: "candidate:3".into(),
            sdp_mid: Some("0".into()),
            sdp_mline_index: None,
            username_fragment: None,
        };
        let c = IceCandidate::from(init);
        assert_eq!(c.sdp_mline_index, 0);
        let back = RTCIceCandidateInit::from(c);
        assert_eq!(back.sdp_mline_index, Some(0));
        assert_eq!(back.sdp_mid.as_deref(), Some("0"));
    }
}
