use async_trait::async_trait;

use crate::error::PipelineError;
use crate::peer::types::{IceCandidate, SessionDescription};

/// The media pipeline as seen by the negotiation core.
///
/// Description and candidate commands are fire-and-forget: implementations
/// return immediately and report failures through their own logging. The
/// pipeline's events (negotiation needed, candidate gathered, track added)
/// are posted to the session through a [`SessionHandle`] given to the
/// implementation at construction.
///
/// [`SessionHandle`]: crate::session::SessionHandle
#[async_trait]
pub trait MediaPipeline: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription, PipelineError>;

    fn set_local_description(&self, description: SessionDescription);

    fn set_remote_description(&self, description: SessionDescription);

    fn add_ice_candidate(&self, candidate: IceCandidate);

    /// Tears the pipeline down. Idempotent.
    async fn close(&self);
}
