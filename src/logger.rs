use std::io::Write;

use log::debug;

use crate::config::DEFAULT_LOG_LEVEL;
use crate::peer::ice::CandidateKind;
use crate::peer::types::{IceCandidate, SessionDescription};

/// Installs the process logger. `RUST_LOG` wins over the build-profile default.
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let env = env_logger::Env::default().default_filter_or(DEFAULT_LOG_LEVEL);
    let _ = env_logger::Builder::from_env(env)
        .format(|buf, record| {
            writeln!(
                buf,
                "RUST: [{}] {:<5} {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init();
}

/// Logs a trickled ICE candidate.
pub fn dump_candidate(label: &str, cand: &IceCandidate) {
    debug!(
        "Trickle {label}: candidate={} kind={} sdp_mline_index={} sdp_mid={:?}",
        cand.candidate,
        CandidateKind::of(&cand.candidate),
        cand.sdp_mline_index,
        cand.sdp_mid
    );
}

pub fn dump_sdp(label: &str, desc: &SessionDescription) {
    debug!("{label} {}:\n{}", desc.sdp_type(), desc.as_text());
}
