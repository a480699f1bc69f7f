//! Diagnostic message severity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic message emitted by the streaming capability.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Map a raw NatNet verbosity value (`1` debug through `4` error).
    ///
    /// Unknown values are treated as informational.
    pub fn from_verbosity(raw: i32) -> Self {
        match raw {
            1 => Severity::Debug,
            3 => Severity::Warning,
            4 => Severity::Error,
            _ => Severity::Info,
        }
    }

    /// Raw verbosity value for this severity.
    pub fn verbosity(self) -> i32 {
        match self {
            Severity::Debug => 1,
            Severity::Info => 2,
            Severity::Warning => 3,
            Severity::Error => 4,
        }
    }

    /// Matching `tracing` level.
    pub fn level(self) -> tracing::Level {
        match self {
            Severity::Debug => tracing::Level::DEBUG,
            Severity::Info => tracing::Level::INFO,
            Severity::Warning => tracing::Level::WARN,
            Severity::Error => tracing::Level::ERROR,
        }
    }

    /// Label used when printing messages.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Debug => "Debug",
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Verbosity value exactly as the streaming capability reported it.
///
/// Values outside `1..=4` are kept so they can still be told apart from
/// genuine informational messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Verbosity(pub i32);

impl Verbosity {
    pub fn severity(self) -> Severity {
        Severity::from_verbosity(self.0)
    }

    /// Whether the value is one of the four known levels.
    pub fn is_known(self) -> bool {
        (1..=4).contains(&self.0)
    }

    /// Label used when printing messages; unknown values print as "Message".
    pub fn label(self) -> &'static str {
        if self.is_known() { self.severity().label() } else { "Message" }
    }
}

impl From<Severity> for Verbosity {
    fn from(severity: Severity) -> Self {
        Verbosity(severity.verbosity())
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_mapping() {
        assert_eq!(Severity::from_verbosity(1), Severity::Debug);
        assert_eq!(Severity::from_verbosity(2), Severity::Info);
        assert_eq!(Severity::from_verbosity(3), Severity::Warning);
        assert_eq!(Severity::from_verbosity(4), Severity::Error);
        assert_eq!(Severity::from_verbosity(-7), Severity::Info);
    }

    #[test]
    fn severities_are_ordered() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Warning < Severity::Error);
        assert_eq!(Severity::Warning.level(), tracing::Level::WARN);
    }

    #[test]
    fn unknown_verbosity_is_info_labelled_message() {
        let unknown = Verbosity(9);
        assert!(!unknown.is_known());
        assert_eq!(unknown.severity(), Severity::Info);
        assert_eq!(unknown.label(), "Message");
        assert_eq!(unknown.severity().level(), tracing::Level::INFO);

        assert_eq!(Verbosity(3).label(), "Warning");
        assert_eq!(Verbosity(0).to_string(), "Message");
    }

    #[test]
    fn severities_round_trip_through_verbosity() {
        for severity in [Severity::Debug, Severity::Info, Severity::Warning, Severity::Error] {
            let verbosity = Verbosity::from(severity);
            assert!(verbosity.is_known());
            assert_eq!(verbosity.severity(), severity);
            assert_eq!(verbosity.label(), severity.label());
        }
    }
}
