use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Failure to open the signaling connection. Always fatal.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid signaling endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("failed to connect to signaling server {url}: {source}")]
    Handshake {
        url: String,
        #[source]
        source: tungstenite::Error,
    },
}

/// Failure to queue an outbound signaling message. Logged, message dropped.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("failed to encode signaling message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("signaling connection is closed")]
    Closed,
}

/// Transport failure while reading the signaling stream.
#[derive(Debug, Error)]
pub enum RecvError {
    #[error("signaling transport error: {0}")]
    Transport(#[from] tungstenite::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    /// The remote SDP text could not be parsed; the negotiation is reset.
    #[error("malformed SDP: {0}")]
    SdpParse(String),

    /// Malformed or out-of-state signaling message; ignored.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("webrtc: {0}")]
    WebRtc(#[from] webrtc::Error),

    #[error("pipeline is closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Terminal outcome of a session. Anything here maps to a non-zero exit status.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Recv(#[from] RecvError),

    #[error("remote peer reported: {0}")]
    Remote(String),

    #[error("no answer received within {0:?}")]
    AnswerTimeout(Duration),

    #[error("pipeline: {0}")]
    Pipeline(#[from] PipelineError),
}
