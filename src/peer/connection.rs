use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use webrtc::api::media_engine::MIME_TYPE_VP8;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::peer::engine::{self, EngineGuard};
use crate::peer::pipeline::MediaPipeline;
use crate::peer::types::{IceCandidate, SdpType, SessionDescription, TrackInfo};
use crate::session::SessionHandle;
use crate::utils::normalize_ice_url;

/// Sending pipeline on top of a webrtc-rs peer connection with one outgoing
/// VP8 track. Whatever produces the video writes samples into
/// [`video_track`](WebRtcPipeline::video_track); this type only negotiates.
pub struct WebRtcPipeline {
    pc: Arc<RTCPeerConnection>,
    video_track: Arc<TrackLocalStaticSample>,
    _engine: EngineGuard,
}

impl WebRtcPipeline {
    /// Builds the peer connection, wires its callbacks to `events` and adds
    /// the video track, which makes the connection ask for negotiation.
    pub async fn start(config: &PipelineConfig, events: SessionHandle) -> Result<Self, PipelineError> {
        let engine = engine::acquire()?;
        let pc = Arc::new(engine.api().new_peer_connection(rtc_config(config)).await?);

        let ev = events.clone();
        pc.on_negotiation_needed(Box::new(move || {
            ev.negotiation_needed();
            Box::pin(async {})
        }));

        let ev = events.clone();
        pc.on_ice_candidate(Box::new(move |cand: Option<RTCIceCandidate>| {
            match cand {
                Some(c) => match c.to_json() {
                    Ok(init) => ev.candidate_gathered(IceCandidate::from(init)),
                    Err(e) => warn!("Failed to serialize local candidate: {}", e),
                },
                // None marks the end of gathering
                None => debug!("ICE candidate gathering completed"),
            }
            Box::pin(async {})
        }));

        let ev = events;
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                ev.track_added(TrackInfo {
                    id: track.id(),
                    stream_id: track.stream_id(),
                    kind: track.kind().to_string(),
                });
                Box::pin(async {})
            },
        ));

        pc.on_peer_connection_state_change(Box::new(move |st: RTCPeerConnectionState| {
            info!("Peer connection state changed to: {:?}", st);
            Box::pin(async {})
        }));

        let video_track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                ..Default::default()
            },
            config.video_track_id.clone(),
            config.stream_id.clone(),
        ));
        pc.add_track(Arc::clone(&video_track) as Arc<dyn TrackLocal + Send + Sync>)
            .await?;
        info!("Pipeline started with VP8 track '{}'", config.video_track_id);

        Ok(Self {
            pc,
            video_track,
            _engine: engine,
        })
    }

    /// The outgoing VP8 track. Samples come from an external media source
    /// (`write_sample`); until one is attached the track stays silent.
    pub fn video_track(&self) -> Arc<TrackLocalStaticSample> {
        self.video_track.clone()
    }
}

#[async_trait]
impl MediaPipeline for WebRtcPipeline {
    async fn create_offer(&self) -> Result<SessionDescription, PipelineError> {
        let offer = self.pc.create_offer(None).await?;
        Ok(SessionDescription::new(SdpType::Offer, offer.sdp))
    }

    fn set_local_description(&self, description: SessionDescription) {
        let pc = self.pc.clone();
        tokio::spawn(async move {
            let result = match to_rtc(description) {
                Ok(desc) => pc.set_local_description(desc).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!("Failed to set local description: {}", e);
            }
        });
    }

    fn set_remote_description(&self, description: SessionDescription) {
        let pc = self.pc.clone();
        tokio::spawn(async move {
            let result = match to_rtc(description) {
                Ok(desc) => pc.set_remote_description(desc).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!("Failed to set remote description: {}", e);
            }
        });
    }

    fn add_ice_candidate(&self, candidate: IceCandidate) {
        let pc = self.pc.clone();
        tokio::spawn(async move {
            let init = RTCIceCandidateInit::from(candidate);
            if let Err(e) = pc.add_ice_candidate(init).await {
                warn!("Failed to add ICE candidate: {}", e);
            }
        });
    }

    async fn close(&self) {
        if let Err(e) = self.pc.close().await {
            warn!("Failed to close peer connection: {}", e);
        }
    }
}

fn to_rtc(description: SessionDescription) -> webrtc::error::Result<RTCSessionDescription> {
    match description.sdp_type() {
        SdpType::Offer => RTCSessionDescription::offer(description.into_text()),
        SdpType::Answer => RTCSessionDescription::answer(description.into_text()),
    }
}

/// Peer connection config: configured STUN server, max-bundle, mandatory rtcp-mux.
fn rtc_config(config: &PipelineConfig) -> RTCConfiguration {
    RTCConfiguration {
        ice_servers: vec![RTCIceServer {
            urls: vec![normalize_ice_url(&config.stun_server)],
            ..Default::default()
        }],
        bundle_policy: RTCBundlePolicy::MaxBundle,
        rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_uses_normalized_stun_and_max_bundle() {
        let cfg = rtc_config(&PipelineConfig::default());
        assert_eq!(cfg.ice_servers.len(), 1);
        assert_eq!(cfg.ice_servers[0].urls, vec!["stun:stun.l.google.com:19302"]);
        assert_eq!(cfg.bundle_policy, RTCBundlePolicy::MaxBundle);
        assert_eq!(cfg.rtcp_mux_policy, RTCRtcpMuxPolicy::Require);
    }

    #[test]
    fn descriptions_convert_by_type() {
        let sdp = "v=0\r\no=- 7 1 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";
        let answer = to_rtc(SessionDescription::new(SdpType::Answer, sdp)).unwrap();
        assert_eq!(answer.sdp, sdp);
        assert_eq!(
            answer.sdp_type,
            webrtc::peer_connection::sdp::sdp_type::RTCSdpType::Answer
        );
        assert!(to_rtc(SessionDescription::new(SdpType::Offer, "junk")).is_err());
    }
}
