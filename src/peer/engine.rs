//! Process-wide webrtc-rs engine.
//!
//! Codec and interceptor registration happens once, before the first session
//! takes a guard, and the engine is dropped when the last guard goes away.

use std::sync::Arc;

use log::info;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::interceptor::registry::Registry;

use crate::error::PipelineError;

#[derive(Default)]
struct EngineState {
    api: Option<Arc<API>>,
    users: usize,
}

static ENGINE: Lazy<Mutex<EngineState>> = Lazy::new(|| Mutex::new(EngineState::default()));

/// Keeps the engine alive while held.
pub struct EngineGuard {
    api: Arc<API>,
}

impl EngineGuard {
    pub fn api(&self) -> &Arc<API> {
        &self.api
    }
}

impl Drop for EngineGuard {
    fn drop(&mut self) {
        let mut state = ENGINE.lock();
        state.users = state.users.saturating_sub(1);
        if state.users == 0 && state.api.take().is_some() {
            info!("media engine released");
        }
    }
}

pub fn acquire() -> Result<EngineGuard, PipelineError> {
    let mut state = ENGINE.lock();
    let api = match &state.api {
        Some(api) => api.clone(),
        None => {
            let api = Arc::new(build_api()?);
            info!("media engine initialized");
            state.api = Some(api.clone());
            api
        }
    };
    state.users += 1;
    Ok(EngineGuard { api })
}

pub fn is_initialized() -> bool {
    ENGINE.lock().api.is_some()
}

fn build_api() -> Result<API, PipelineError> {
    let mut media_engine = MediaEngine::default();
    media_engine.register_default_codecs()?;

    let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

    Ok(APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_is_shared_and_released_with_last_guard() {
        let first = acquire().unwrap();
        let second = acquire().unwrap();
        assert!(Arc::ptr_eq(first.api(), second.api()));
        assert!(is_initialized());

        drop(first);
        assert!(is_initialized());
        drop(second);
        assert!(!is_initialized());

        let again = acquire().unwrap();
        assert!(is_initialized());
        drop(again);
    }
}
