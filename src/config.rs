//! Configuration loader and validator for the bulk dispatcher.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Transport-imposed hard limit on video payloads.
pub const DEFAULT_VIDEO_LIMIT_BYTES: u64 = 14 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub bridge: Bridge,
    pub media: Media,
    pub pacing: Pacing,
    pub limits: Limits,
}

/// Automation gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Bridge {
    pub base_url: String,
    pub session: String,
    /// Bearer token for the gateway, if it requires one.
    pub token: Option<String>,
}

/// Root directories attachments are resolved under, by bare filename.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Media {
    pub images_dir: String,
    pub videos_dir: String,
    pub files_dir: String,
}

/// Delay discipline between transport actions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Pacing {
    /// One-time warm-up after the session opens, while the client syncs.
    pub initial_delay_seconds: u64,
    /// After every successful send + ack.
    pub action_delay_seconds: u64,
    /// Between recipients, regardless of outcome.
    pub settle_delay_seconds: u64,
    /// Upper bound on waiting for a delivery acknowledgement.
    pub ack_timeout_seconds: u64,
}

/// Transport payload limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Limits {
    pub video_max_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bridge: Bridge::default(),
            media: Media::default(),
            pacing: Pacing::default(),
            limits: Limits::default(),
        }
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:21465".into(),
            session: "default".into(),
            token: None,
        }
    }
}

impl Default for Media {
    fn default() -> Self {
        Self {
            images_dir: "Images".into(),
            videos_dir: "Videos".into(),
            files_dir: "Files".into(),
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            initial_delay_seconds: 5,
            action_delay_seconds: 2,
            settle_delay_seconds: 1,
            ack_timeout_seconds: 60,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            video_max_bytes: DEFAULT_VIDEO_LIMIT_BYTES,
        }
    }
}

impl Config {
    pub fn images_root(&self) -> PathBuf {
        PathBuf::from(&self.media.images_dir)
    }

    pub fn videos_root(&self) -> PathBuf {
        PathBuf::from(&self.media.videos_dir)
    }

    pub fn files_root(&self) -> PathBuf {
        PathBuf::from(&self.media.files_dir)
    }
}

impl Pacing {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_seconds)
    }

    pub fn action_delay(&self) -> Duration {
        Duration::from_secs(self.action_delay_seconds)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_seconds)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_secs(self.ack_timeout_seconds)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, the built-in defaults are used.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let cfg = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            serde_yaml::from_str(&content)?
        }
        None => Config::default(),
    };
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.bridge.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("bridge.base_url must be non-empty"));
    }
    if cfg.bridge.session.trim().is_empty() {
        return Err(ConfigError::Invalid("bridge.session must be non-empty"));
    }

    if cfg.media.images_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("media.images_dir must be non-empty"));
    }
    if cfg.media.videos_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("media.videos_dir must be non-empty"));
    }
    if cfg.media.files_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("media.files_dir must be non-empty"));
    }

    if cfg.pacing.ack_timeout_seconds == 0 {
        return Err(ConfigError::Invalid("pacing.ack_timeout_seconds must be > 0"));
    }

    if cfg.limits.video_max_bytes == 0 {
        return Err(ConfigError::Invalid("limits.video_max_bytes must be > 0"));
    }

    Ok(())
}

/// Example YAML config, matching the defaults.
pub fn example() -> &'static str {
    r#"bridge:
  base_url: "http://127.0.0.1:21465"
  session: "default"

media:
  images_dir: "Images"
  videos_dir: "Videos"
  files_dir: "Files"

pacing:
  initial_delay_seconds: 5
  action_delay_seconds: 2
  settle_delay_seconds: 1
  ack_timeout_seconds: 60

limits:
  video_max_bytes: 14680064
"#
}
