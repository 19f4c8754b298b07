//! Consumer-facing status reports
//!
//! Every lifecycle milestone and failure is surfaced to the consumer as a
//! tagged text line, `"KIND: text"`. The kinds are a closed enumeration and
//! the texts come from a fixed catalog, so consumers can both read and
//! pattern-match them.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::Capability;
use crate::errors::ScanFailure;

// ----------------------------------------------------------------------------
// Status Kinds
// ----------------------------------------------------------------------------

/// Category prefix of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    /// Informational state change
    State,
    /// Discovery pass progress
    Scanning,
    /// Filter matched an advertisement
    Match,
    /// Connection establishment progress
    Link,
    /// Scan window elapsed without a match
    Timeout,
    /// Platform reported a scan failure
    ScanFailed,
    /// Terminal failure surfaced to the consumer
    Error,
    /// Caught exception surfaced as text
    Exception,
    /// User intervention required to recover
    ManualAction,
    /// Data stream milestones
    Bridge,
    /// Privileged operation skipped for lack of authorization
    PermissionDenied,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusKind::State => write!(f, "STATE"),
            StatusKind::Scanning => write!(f, "SCANNING"),
            StatusKind::Match => write!(f, "MATCH"),
            StatusKind::Link => write!(f, "LINK"),
            StatusKind::Timeout => write!(f, "TIMEOUT"),
            StatusKind::ScanFailed => write!(f, "SCAN_FAILED"),
            StatusKind::Error => write!(f, "ERROR"),
            StatusKind::Exception => write!(f, "EXCEPTION"),
            StatusKind::ManualAction => write!(f, "MANUAL_ACTION"),
            StatusKind::Bridge => write!(f, "BRIDGE"),
            StatusKind::PermissionDenied => write!(f, "PERMISSION_DENIED"),
        }
    }
}

// ----------------------------------------------------------------------------
// Status Reports
// ----------------------------------------------------------------------------

/// One tagged status line for the consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusReport {
    pub fn new(kind: StatusKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Radio enable flow granted by the user
    pub fn bluetooth_authorized() -> Self {
        Self::new(StatusKind::State, "Bluetooth authorized.")
    }

    /// Radio enable flow refused by the user
    pub fn activation_denied() -> Self {
        Self::new(StatusKind::Error, "Bluetooth activation denied.")
    }

    /// No adapter could be acquired from the platform
    pub fn scanner_unavailable() -> Self {
        Self::new(
            StatusKind::Error,
            "System Scanner not found. Bluetooth service busy.",
        )
    }

    /// Discovery pass started
    pub fn scan_started() -> Self {
        Self::new(StatusKind::Scanning, "Hunting for OSM hardware...")
    }

    /// Scan window elapsed without a match
    pub fn scan_timeout(window: Duration) -> Self {
        Self::new(
            StatusKind::Timeout,
            format!("Bridge not found in {}s.", window.as_secs()),
        )
    }

    /// Platform scan failure, with the stack-exhausted code called out
    pub fn scan_failed(failure: &ScanFailure) -> Self {
        let text = match failure {
            ScanFailure::StackExhausted => {
                format!(
                    "Code {}: Stack Full. Manual Reset Req.",
                    ScanFailure::STACK_EXHAUSTED_CODE
                )
            }
            ScanFailure::Failed(code) => format!("Error Code {}", code),
        };
        Self::new(StatusKind::ScanFailed, text)
    }

    /// Caught exception surfaced as text
    pub fn exception(message: impl fmt::Display) -> Self {
        Self::new(StatusKind::Exception, message.to_string())
    }

    /// Advertisement passed the name filter
    pub fn matched(name: &str) -> Self {
        Self::new(StatusKind::Match, format!("{} found.", name))
    }

    /// Connection attempt dispatched
    pub fn contacting_hardware() -> Self {
        Self::new(StatusKind::Link, "Contacting hardware...")
    }

    /// Transport reported the connection is up
    pub fn handshake_initiated() -> Self {
        Self::new(StatusKind::Link, "Handshake initiated.")
    }

    /// MTU exchange concluded
    pub fn mtu_synced(mtu: u16) -> Self {
        Self::new(StatusKind::Link, format!("MTU Sync ({} bytes)", mtu))
    }

    /// Well-known service or data characteristic absent on the device
    pub fn service_missing() -> Self {
        Self::new(StatusKind::Error, "NUS Service not found on hardware.")
    }

    /// Notifications enabled, frames will flow
    pub fn stream_active() -> Self {
        Self::new(StatusKind::Bridge, "Live stream active.")
    }

    /// Transport dropped the link
    pub fn link_terminated() -> Self {
        Self::new(StatusKind::Link, "Terminated.")
    }

    /// Commanded teardown finished releasing resources
    pub fn resources_purged() -> Self {
        Self::new(StatusKind::State, "Resources Purged.")
    }

    /// Manual radio power-cycle instruction after an unrecoverable stack state
    pub fn manual_radio_reset() -> Self {
        Self::new(
            StatusKind::ManualAction,
            "Toggle Bluetooth OFF/ON to reset system stack.",
        )
    }

    /// Privileged operation skipped because authorization is missing
    pub fn permission_missing(capability: Capability) -> Self {
        Self::new(
            StatusKind::PermissionDenied,
            format!("{} authorization missing.", capability),
        )
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.text)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
