//! Session configuration.
//!
//! Every field has a default, so an empty YAML document is a valid configuration:
//!
//! ```rust
//! use pumplink::SessionConfig;
//!
//! let config = SessionConfig::from_yaml_str("download_attempts: 5\n").unwrap();
//! assert_eq!(config.download_attempts, 5);
//! assert!(config.download);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::{PumpError, Result};

fn default_download() -> bool {
    true
}

fn default_signal_threshold() -> i32 {
    50
}

fn default_signal_poll_limit() -> u32 {
    200
}

fn default_download_attempts() -> u32 {
    3
}

fn default_download_backoff_ms() -> u64 {
    10
}

/// Retry and download policy shared by every command on a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Download a response after each transmit.
    #[serde(default = "default_download")]
    pub download: bool,

    /// Signal strength `init` waits for.
    #[serde(default = "default_signal_threshold")]
    pub signal_threshold: i32,

    /// Signal polls before `init` gives up.
    #[serde(default = "default_signal_poll_limit")]
    pub signal_poll_limit: u32,

    /// Pause between signal polls.
    #[serde(default)]
    pub signal_poll_interval_ms: u64,

    /// Device downloads per command before failing with every cause.
    #[serde(default = "default_download_attempts")]
    pub download_attempts: u32,

    /// Pause after a failed download.
    #[serde(default = "default_download_backoff_ms")]
    pub download_backoff_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            download: default_download(),
            signal_threshold: default_signal_threshold(),
            signal_poll_limit: default_signal_poll_limit(),
            signal_poll_interval_ms: 0,
            download_attempts: default_download_attempts(),
            download_backoff_ms: default_download_backoff_ms(),
        }
    }
}

impl SessionConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| PumpError::parse_error("session configuration", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| PumpError::File { path: path.to_path_buf(), source: e })?;
        debug!("Loaded session configuration from {}", path.display());
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.download_attempts == 0 {
            return Err(PumpError::config_error("download_attempts must be at least 1"));
        }
        if self.signal_poll_limit == 0 {
            return Err(PumpError::config_error("signal_poll_limit must be at least 1"));
        }
        Ok(())
    }

    pub fn download_backoff(&self) -> Duration {
        Duration::from_millis(self.download_backoff_ms)
    }

    pub fn signal_poll_interval(&self) -> Duration {
        Duration::from_millis(self.signal_poll_interval_ms)
    }
}

/// Configuration for a [`Pump`](crate::session::Pump) session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PumpConfig {
    /// Six digit serial printed on the pump.
    pub serial: String,

    #[serde(flatten)]
    pub session: SessionConfig,
}

impl PumpConfig {
    pub fn new(serial: impl Into<String>) -> Self {
        Self { serial: serial.into(), session: SessionConfig::default() }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| PumpError::parse_error("pump configuration", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| PumpError::File { path: path.to_path_buf(), source: e })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.serial.len() != 6 || !self.serial.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PumpError::config_error(format!(
                "serial must be six digits, got {:?}",
                self.serial
            )));
        }
        self.session.validate()
    }
}
