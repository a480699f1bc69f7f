//! Harness configuration loaded from YAML
//!
//! A config file is optional; every field has a default, and command-line
//! flags are applied on top of the loaded values before validation.
//!
//! ```yaml
//! connection:
//!   server_address: 192.168.1.20
//!   local_address: 192.168.1.10
//!   transport: unicast
//! poll_interval_ms: 50
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::{HarnessError, Result};
use crate::session::SessionOptions;
use crate::types::{ConnectionConfig, RawConnectionConfig};

/// Settings for one console run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub connection: RawConnectionConfig,
    /// Idle loop check interval
    pub poll_interval_ms: u64,
    /// Fetch and log the scene description after connecting
    pub fetch_descriptions: bool,
    pub frame_queue_capacity: usize,
    pub message_queue_capacity: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let options = SessionOptions::default();
        Self {
            connection: RawConnectionConfig::default(),
            poll_interval_ms: 100,
            fetch_descriptions: true,
            frame_queue_capacity: options.frame_queue_capacity,
            message_queue_capacity: options.message_queue_capacity,
        }
    }
}

impl HarnessConfig {
    /// Read a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| HarnessError::ConfigFile { path: path.to_path_buf(), source })?;
        let config = serde_yaml_ng::from_str(&text)
            .map_err(|source| HarnessError::ConfigParse { path: path.to_path_buf(), source })?;
        debug!(path = %path.display(), "Loaded harness config");
        Ok(config)
    }

    /// Parse YAML text. An empty document yields the defaults.
    pub fn from_yaml_str(text: &str) -> std::result::Result<Self, serde_yaml_ng::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(text)
    }

    /// Validated connection settings.
    pub fn connection_config(&self) -> Result<ConnectionConfig> {
        ConnectionConfig::from_raw(self.connection.clone())
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            frame_queue_capacity: self.frame_queue_capacity,
            message_queue_capacity: self.message_queue_capacity,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
