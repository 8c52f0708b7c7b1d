//! Send side of a single-peer WebRTC session: connects to a WebSocket
//! rendezvous server, offers the local media, and trickles ICE candidates
//! both ways until the peer answers.

pub mod config;
pub mod error;
pub mod logger;
pub mod orchestrator;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod utils;

use std::sync::Arc;

use log::info;

pub use config::Config;
pub use error::SessionError;
pub use orchestrator::{SessionOptions, SessionOrchestrator};
pub use session::SessionHandle;

use peer::WebRtcPipeline;

/// Connects, starts the pipeline and runs one session to completion.
/// Ctrl-C requests a clean shutdown.
pub async fn run(config: Config) -> Result<(), SessionError> {
    let connection = signaling::connect(&config.signaling.server_url).await?;

    let (handle, mailbox) = session::mailbox();
    let pipeline = WebRtcPipeline::start(&config.pipeline, handle.clone()).await?;

    let orchestrator = SessionOrchestrator::new(
        connection,
        Arc::new(pipeline),
        mailbox,
        SessionOptions {
            answer_timeout: config.answer_timeout(),
        },
    );

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, shutting down");
            handle.shutdown();
        }
    });

    orchestrator.run().await
}
