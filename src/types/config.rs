//! Connection settings handed to the streaming capability

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{HarnessError, Result};

/// Default NatNet command port.
pub const DEFAULT_COMMAND_PORT: u16 = 1510;
/// Default NatNet data port.
pub const DEFAULT_DATA_PORT: u16 = 1511;
/// Multicast group Motive streams to unless configured otherwise.
pub const DEFAULT_MULTICAST_ADDRESS: &str = "239.255.42.99";

/// How frame data travels from the server to this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Multicast,
    Unicast,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Multicast => f.write_str("multicast"),
            TransportMode::Unicast => f.write_str("unicast"),
        }
    }
}

impl FromStr for TransportMode {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "multicast" => Ok(TransportMode::Multicast),
            "unicast" => Ok(TransportMode::Unicast),
            other => Err(HarnessError::config(
                "transport",
                format!("expected 'multicast' or 'unicast', got '{other}'"),
            )),
        }
    }
}

/// Validated connection settings.
///
/// Built once at startup and never mutated. Construct through
/// [`ConnectionConfig::new`] or [`ConnectionConfig::from_raw`]; both validate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionConfig {
    server_address: String,
    local_address: String,
    multicast_address: Option<String>,
    command_port: u16,
    data_port: u16,
    transport: TransportMode,
}

impl ConnectionConfig {
    /// Create a config with default ports and multicast transport.
    pub fn new(server_address: impl Into<String>, local_address: impl Into<String>) -> Result<Self> {
        Self::from_raw(RawConnectionConfig {
            server_address: server_address.into(),
            local_address: local_address.into(),
            ..RawConnectionConfig::default()
        })
    }

    /// Validate raw settings (from a file or the command line).
    ///
    /// Addresses must be non-empty and ports must lie in `1..=65535`.
    pub fn from_raw(raw: RawConnectionConfig) -> Result<Self> {
        let config = Self {
            server_address: require_address("server_address", raw.server_address)?,
            local_address: require_address("local_address", raw.local_address)?,
            multicast_address: raw
                .multicast_address
                .map(|addr| require_address("multicast_address", addr))
                .transpose()?,
            command_port: require_port("command_port", raw.command_port)?,
            data_port: require_port("data_port", raw.data_port)?,
            transport: raw.transport,
        };
        Ok(config)
    }

    /// Use the given transport mode.
    pub fn with_transport(mut self, transport: TransportMode) -> Self {
        self.transport = transport;
        self
    }

    /// Use the given command and data ports.
    pub fn with_ports(mut self, command_port: u32, data_port: u32) -> Result<Self> {
        self.command_port = require_port("command_port", command_port)?;
        self.data_port = require_port("data_port", data_port)?;
        Ok(self)
    }

    /// Use the given multicast group.
    pub fn with_multicast_address(mut self, address: impl Into<String>) -> Result<Self> {
        self.multicast_address = Some(require_address("multicast_address", address.into())?);
        Ok(self)
    }

    pub fn server_address(&self) -> &str {
        &self.server_address
    }

    pub fn local_address(&self) -> &str {
        &self.local_address
    }

    /// Multicast group, if one was configured explicitly.
    pub fn multicast_address(&self) -> Option<&str> {
        self.multicast_address.as_deref()
    }

    /// Multicast group the client should join, falling back to Motive's default.
    pub fn effective_multicast_address(&self) -> &str {
        self.multicast_address.as_deref().unwrap_or(DEFAULT_MULTICAST_ADDRESS)
    }

    pub fn command_port(&self) -> u16 {
        self.command_port
    }

    pub fn data_port(&self) -> u16 {
        self.data_port
    }

    pub fn transport(&self) -> TransportMode {
        self.transport
    }
}

impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "server={} local={} ports={}/{} transport={}",
            self.server_address, self.local_address, self.command_port, self.data_port, self.transport
        )?;
        if self.transport == TransportMode::Multicast {
            write!(f, " group={}", self.effective_multicast_address())?;
        }
        Ok(())
    }
}

/// Unvalidated connection settings as they appear in a config file.
///
/// Ports are wider than `u16` so out-of-range values are rejected with a
/// [`HarnessError::Config`] instead of a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConnectionConfig {
    pub server_address: String,
    pub local_address: String,
    pub multicast_address: Option<String>,
    pub command_port: u32,
    pub data_port: u32,
    pub transport: TransportMode,
}

impl Default for RawConnectionConfig {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1".to_string(),
            local_address: "127.0.0.1".to_string(),
            multicast_address: None,
            command_port: u32::from(DEFAULT_COMMAND_PORT),
            data_port: u32::from(DEFAULT_DATA_PORT),
            transport: TransportMode::Multicast,
        }
    }
}

impl TryFrom<RawConnectionConfig> for ConnectionConfig {
    type Error = HarnessError;

    fn try_from(raw: RawConnectionConfig) -> Result<Self> {
        ConnectionConfig::from_raw(raw)
    }
}

fn require_address(field: &'static str, address: String) -> Result<String> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(HarnessError::config(field, "address must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn require_port(field: &'static str, port: u32) -> Result<u16> {
    match u16::try_from(port) {
        Ok(0) | Err(_) => {
            Err(HarnessError::config(field, format!("port {port} is outside 1..=65535")))
        }
        Ok(port) => Ok(port),
    }
}
