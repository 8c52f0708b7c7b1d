use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::peer::state::{
    DEFAULT_ANSWER_TIMEOUT_SECS, DEFAULT_SIGNALING_SERVER, DEFAULT_STUN_SERVER,
};

/// Log filter used when `RUST_LOG` is unset: verbose in debug builds.
#[cfg(debug_assertions)]
pub const DEFAULT_LOG_LEVEL: &str = "debug";

#[cfg(not(debug_assertions))]
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub signaling: SignalingConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    /// Rendezvous server, `ws://` or `wss://`
    pub server_url: String,
    /// Seconds to wait for the answer once the offer is out; 0 waits forever
    pub answer_timeout_secs: u64,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SIGNALING_SERVER.to_string(),
            answer_timeout_secs: DEFAULT_ANSWER_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// STUN server; `stun://host:port`, `stun:host:port` or bare `host:port`
    pub stun_server: String,
    pub video_track_id: String,
    pub stream_id: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stun_server: DEFAULT_STUN_SERVER.to_string(),
            video_track_id: "video".to_string(),
            stream_id: "rtc-send".to_string(),
        }
    }
}

/// Values that take precedence over the file (environment, command line).
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub server_url: Option<String>,
    pub stun_server: Option<String>,
    pub answer_timeout_secs: Option<u64>,
}

impl Config {
    /// Loads a TOML file; a missing file yields the defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&contents)?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("rtc-send.toml")
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.server_url {
            self.signaling.server_url = url;
        }
        if let Some(stun) = overrides.stun_server {
            self.pipeline.stun_server = stun;
        }
        if let Some(secs) = overrides.answer_timeout_secs {
            self.signaling.answer_timeout_secs = secs;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.signaling.server_url;
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(ConfigError::Invalid(format!(
                "signaling server must be a ws:// or wss:// URL, got '{}'",
                url
            )));
        }
        if self.pipeline.stun_server.trim().is_empty() {
            return Err(ConfigError::Invalid("STUN server cannot be empty".into()));
        }
        if self.pipeline.video_track_id.is_empty() || self.pipeline.stream_id.is_empty() {
            return Err(ConfigError::Invalid(
                "track and stream ids cannot be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn answer_timeout(&self) -> Option<Duration> {
        match self.signaling.answer_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.signaling.server_url, "ws://0.0.0.0:8765");
        assert_eq!(config.pipeline.stun_server, "stun://stun.l.google.com:19302");
        assert_eq!(config.answer_timeout(), Some(Duration::from_secs(30)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rtc-send.toml");
        fs::write(
            &path,
            "[signaling]\nserver_url = \"wss://signal.example.org:443\"\n",
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.signaling.server_url, "wss://signal.example.org:443");
        assert_eq!(config.signaling.answer_timeout_secs, 30);
        assert_eq!(config.pipeline, PipelineConfig::default());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = Config::load_from_file("definitely/not/here.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn broken_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[signaling\nserver_url = 3").unwrap();
        assert!(matches!(
            Config::load_from_file(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn overrides_win() {
        let mut config = Config::default();
        config.apply(ConfigOverrides {
            server_url: Some("ws://10.0.0.2:9000".into()),
            stun_server: None,
            answer_timeout_secs: Some(0),
        });
        assert_eq!(config.signaling.server_url, "ws://10.0.0.2:9000");
        assert_eq!(config.pipeline.stun_server, DEFAULT_STUN_SERVER);
        assert_eq!(config.answer_timeout(), None);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = Config::default();
        config.signaling.server_url = "http://0.0.0.0:8765".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.stun_server = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_round_trip_has_sections() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(text.contains("[signaling]"));
        assert!(text.contains("[pipeline]"));
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, Config::default());
    }
}
