//! Error types for the session harness.
//!
//! Every failure the harness can report is a [`HarnessError`]. Codes coming
//! back from the streaming capability are carried verbatim as [`ErrorCode`]
//! so the numeric value always reaches the user.
//!
//! ## Error Categories
//!
//! - **Configuration**: bad address or port, rejected before any I/O
//! - **Connection**: transport failures and the absent-host handshake
//! - **Registration**: the capability refused a callback
//! - **Fetch**: data description retrieval failed (non-fatal)
//! - **Handler**: a user callback returned an error or panicked (logged only)
//!
//! ```rust
//! use mocap_harness::{ErrorCode, HarnessError};
//!
//! let error = HarnessError::connect_failed(ErrorCode::NETWORK);
//! assert!(error.is_fatal());
//! assert_eq!(error.code(), Some(ErrorCode::NETWORK));
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::convert::Infallible;
use std::path::PathBuf;
use thiserror::Error;

use crate::client::ErrorCode;

/// Result type alias for harness operations.
pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

/// Main error type for harness operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HarnessError {
    #[error("Invalid configuration for {field}: {reason}")]
    Config { field: &'static str, reason: String },

    #[error("Failed to connect to streaming server (error code {code})")]
    Connect { code: ErrorCode },

    #[error("Unable to connect to Motive server at {server}: no host present")]
    ServerAbsent { server: String },

    #[error("Failed to register {callback} callback (error code {code})")]
    Registration { callback: &'static str, code: ErrorCode },

    #[error("Failed to fetch data descriptions: {reason}{}", code_suffix(.code))]
    Fetch { reason: String, code: Option<ErrorCode> },

    #[error("{handler} handler failed: {reason}")]
    Handler { handler: &'static str, reason: String },

    #[error("Failed to disconnect from streaming server (error code {code})")]
    Disconnect { code: ErrorCode },

    #[error("Session has been shut down")]
    Closed,

    #[error("Failed to read config file {path}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },
}

fn code_suffix(code: &Option<ErrorCode>) -> String {
    code.map(|code| format!(" (error code {code})")).unwrap_or_default()
}

impl HarnessError {
    /// Numeric capability code carried by this error, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            HarnessError::Connect { code }
            | HarnessError::Registration { code, .. }
            | HarnessError::Disconnect { code } => Some(*code),
            HarnessError::Fetch { code, .. } => *code,
            _ => None,
        }
    }

    /// Whether this error aborts startup.
    ///
    /// Fetch and handler failures are reported but the session keeps running.
    pub fn is_fatal(&self) -> bool {
        match self {
            HarnessError::Config { .. }
            | HarnessError::Connect { .. }
            | HarnessError::ServerAbsent { .. }
            | HarnessError::Registration { .. }
            | HarnessError::Closed
            | HarnessError::ConfigFile { .. }
            | HarnessError::ConfigParse { .. } => true,
            HarnessError::Fetch { .. }
            | HarnessError::Handler { .. }
            | HarnessError::Disconnect { .. } => false,
        }
    }

    /// Process exit status for this error when it ends the program.
    pub fn exit_code(&self) -> u8 {
        if self.is_fatal() { 1 } else { 0 }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            HarnessError::Config { .. } => vec![
                "Provide non-empty server and local addresses",
                "Use ports between 1 and 65535",
            ],
            HarnessError::Connect { .. } => vec![
                "Check that Motive is running and streaming is enabled",
                "Verify the server and local addresses are reachable",
                "Make sure the command and data ports are not in use",
            ],
            HarnessError::ServerAbsent { .. } => vec![
                "Confirm the server address points at the Motive host",
                "Check the transport mode matches the server's streaming settings",
                "Check firewall rules for the command port",
            ],
            HarnessError::Registration { .. } => vec![
                "Register callbacks on a client that has not been disconnected",
                "Check the client library version",
            ],
            HarnessError::Fetch { .. } => vec![
                "Connect the session before requesting descriptions",
                "Retry once the server has finished loading the scene",
            ],
            HarnessError::Handler { .. } => {
                vec!["Inspect the handler for panics or error returns"]
            }
            HarnessError::Disconnect { .. } => {
                vec!["Restart the client process if the server keeps the stale connection"]
            }
            HarnessError::Closed => vec!["Create a new session after shutdown"],
            HarnessError::ConfigFile { .. } => {
                vec!["Check the config file exists and is readable"]
            }
            HarnessError::ConfigParse { .. } => {
                vec!["Check the config file is valid YAML with the expected keys"]
            }
        }
    }

    /// Helper constructor for configuration errors.
    pub fn config(field: &'static str, reason: impl Into<String>) -> Self {
        HarnessError::Config { field, reason: reason.into() }
    }

    /// Helper constructor for transport connection failures.
    pub fn connect_failed(code: ErrorCode) -> Self {
        HarnessError::Connect { code }
    }

    /// Helper constructor for callback registration failures.
    pub fn registration_failed(callback: &'static str, code: ErrorCode) -> Self {
        HarnessError::Registration { callback, code }
    }

    /// Helper constructor for description fetch failures.
    pub fn fetch_failed(reason: impl Into<String>, code: Option<ErrorCode>) -> Self {
        HarnessError::Fetch { reason: reason.into(), code }
    }

    /// Helper constructor for handler failures.
    pub fn handler_failed(handler: &'static str, reason: impl Into<String>) -> Self {
        HarnessError::Handler { handler, reason: reason.into() }
    }
}

impl From<Infallible> for HarnessError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn connect_errors_always_show_the_numeric_code(raw in any::<i32>()) {
            let error = HarnessError::connect_failed(ErrorCode(raw));
            prop_assert!(error.to_string().contains(&raw.to_string()));
            prop_assert_eq!(error.code(), Some(ErrorCode(raw)));
        }

        #[test]
        fn fetch_errors_mention_code_only_when_present(
            reason in "[a-z]{1,20}",
            raw in proptest::option::of(any::<i32>())
        ) {
            let error = HarnessError::fetch_failed(reason.clone(), raw.map(ErrorCode));
            let message = error.to_string();
            prop_assert!(message.contains(&reason));
            prop_assert_eq!(message.contains("error code"), raw.is_some());
            prop_assert!(!error.is_fatal());
        }
    }

    #[test]
    fn startup_errors_are_fatal() {
        assert!(HarnessError::config("data_port", "must be in 1..=65535").is_fatal());
        assert!(HarnessError::connect_failed(ErrorCode::NETWORK).is_fatal());
        assert!(HarnessError::ServerAbsent { server: "10.0.0.1".into() }.is_fatal());
        assert!(HarnessError::registration_failed("frame", ErrorCode::INTERNAL).is_fatal());
        assert_eq!(HarnessError::connect_failed(ErrorCode::NETWORK).exit_code(), 1);
    }

    #[test]
    fn handler_errors_are_not_fatal() {
        let error = HarnessError::handler_failed("frame", "boom");
        assert!(!error.is_fatal());
        assert_eq!(error.exit_code(), 0);
        assert_eq!(error.code(), None);
        assert_eq!(error.to_string(), "frame handler failed: boom");
    }

    #[test]
    fn every_variant_has_recovery_suggestions() {
        let errors = [
            HarnessError::config("server_address", "empty"),
            HarnessError::connect_failed(ErrorCode::NETWORK),
            HarnessError::ServerAbsent { server: "host".into() },
            HarnessError::registration_failed("message", ErrorCode::OTHER),
            HarnessError::fetch_failed("not connected", None),
            HarnessError::handler_failed("frame", "panic"),
            HarnessError::Disconnect { code: ErrorCode::OTHER },
            HarnessError::Closed,
        ];

        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty(), "no suggestions for {error}");
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<HarnessError>();

        let error = HarnessError::Closed;
        let _: &dyn std::error::Error = &error;
    }
}
