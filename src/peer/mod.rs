pub mod connection;
pub mod engine;
pub mod ice;
pub mod negotiator;
pub mod pipeline;
pub mod state;
pub mod types;

pub use connection::WebRtcPipeline;
pub use ice::{CandidateKind, IceCandidateRelay};
pub use negotiator::Negotiator;
pub use pipeline::MediaPipeline;
pub use state::NegotiationState;
pub use types::{IceCandidate, SdpPayload, SdpType, SessionDescription, SignalingMessage, TrackInfo};
