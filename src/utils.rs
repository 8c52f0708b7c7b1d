use rand::Rng;

pub fn random_id() -> String {
    hex::encode(rand::rng().random::<[u8; 8]>())
}

/// Brings an ICE server address into the `stun:`/`turn:` form webrtc-rs
/// expects. Accepts the GStreamer-style `stun://host:port` and bare
/// `host:port` (treated as STUN).
pub fn normalize_ice_url(url: &str) -> String {
    let url = url.trim();
    for scheme in ["stun", "stuns", "turn", "turns"] {
        if let Some(rest) = url.strip_prefix(scheme).and_then(|r| r.strip_prefix(':')) {
            return format!("{}:{}", scheme, rest.trim_start_matches("//"));
        }
    }
    format!("stun:{}", url)
}
