//! Channel Communication Protocol Types
//!
//! This module defines the typed communication protocol between the consumer,
//! the link driver, the state machine, and the transport backend. All
//! inter-task communication flows through these channel message types.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ScanFailure;
use crate::session::SessionId;
use crate::status::StatusReport;

// ----------------------------------------------------------------------------
// Command: Consumer → Link Driver
// ----------------------------------------------------------------------------

/// Commands sent from the consumer to the link driver
///
/// All commands are parameterless and idempotent; repeating one never
/// corrupts the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Tear down any existing session, then scan for and link the bridge
    StartLink,
    /// Tear down the current session, releasing scan and transport resources
    Disconnect,
    /// Open the platform Bluetooth settings page for a manual radio reset
    OpenRadioSettings,
}

// ----------------------------------------------------------------------------
// LinkEvent: Transport → Link Driver
// ----------------------------------------------------------------------------

/// Events sent from the transport backend to the link driver
///
/// Every variant carries the [`SessionId`] it was produced under. The driver
/// drops events whose id is not the live session's before they reach the
/// state machine, so callbacks from a superseded session can never act.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LinkEvent {
    /// First advertisement whose name passed the filter
    ScanMatch { session: SessionId, name: String },
    /// Platform reported a scan failure
    ScanFailed {
        session: SessionId,
        failure: ScanFailure,
    },
    /// Connection to the matched device is up
    Connected { session: SessionId },
    /// Connection attempt failed; no retry is performed
    ConnectFailed { session: SessionId, reason: String },
    /// MTU exchange concluded with the granted value
    MtuChanged { session: SessionId, mtu: u16 },
    /// Service discovery finished
    ServicesDiscovered {
        session: SessionId,
        outcome: DiscoveryOutcome,
    },
    /// Client-configuration write for notifications was dispatched
    SubscriptionDispatched { session: SessionId },
    /// Notification subscription could not be dispatched
    SubscriptionFailed { session: SessionId, reason: String },
    /// Notification payload from the data characteristic
    Notification {
        session: SessionId,
        payload: Vec<u8>,
    },
    /// The transport dropped the link unsolicited
    LinkLost { session: SessionId },
}

impl LinkEvent {
    /// Session identity this event was produced under
    pub fn session(&self) -> SessionId {
        match self {
            LinkEvent::ScanMatch { session, .. }
            | LinkEvent::ScanFailed { session, .. }
            | LinkEvent::Connected { session }
            | LinkEvent::ConnectFailed { session, .. }
            | LinkEvent::MtuChanged { session, .. }
            | LinkEvent::ServicesDiscovered { session, .. }
            | LinkEvent::SubscriptionDispatched { session }
            | LinkEvent::SubscriptionFailed { session, .. }
            | LinkEvent::Notification { session, .. }
            | LinkEvent::LinkLost { session } => *session,
        }
    }
}

// ----------------------------------------------------------------------------
// Effect: State Machine → Link Driver (External Side Effects Only)
// ----------------------------------------------------------------------------

/// Effects the state machine asks the driver to execute against the radio
///
/// Effects describe external side effects only; the machine itself never
/// touches the transport. Timer effects carry their delay so the policy
/// constants stay in one place ([`crate::config::LinkConfig`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Begin a discovery pass over all advertisement types
    StartScan,
    /// Abort any scan in flight; safe no-op while idle
    StopScan,
    /// Open a connection to the matched device
    Connect,
    /// Request an MTU size increase
    RequestMtu { target: u16 },
    /// Request service discovery on the connected device
    DiscoverServices,
    /// Enable notifications and write the client-configuration descriptor
    Subscribe,
    /// Release the transport handle and any subscription
    TearDownTransport,
    /// Arm the scan-window timer
    ArmScanTimeout { delay: Duration },
    /// Arm a settle timer guarding the next stack operation
    ArmSettleTimer { point: SettlePoint, delay: Duration },
}

// ----------------------------------------------------------------------------
// AppEvent: Link Driver → Consumer
// ----------------------------------------------------------------------------

/// Events delivered to the consumer, in emission order, fire-and-forget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppEvent {
    /// Human-readable tagged status line
    Status(StatusReport),
    /// Session entered or left the streaming state, or terminated
    Connection(ConnectionSignal),
    /// Sanitized text frame relayed from the bridge
    Data(String),
}

// ----------------------------------------------------------------------------
// Supporting Types
// ----------------------------------------------------------------------------

/// Connection-state signal for the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionSignal {
    Connected,
    Disconnected,
    Error,
}

impl fmt::Display for ConnectionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionSignal::Connected => write!(f, "connected"),
            ConnectionSignal::Disconnected => write!(f, "disconnected"),
            ConnectionSignal::Error => write!(f, "error"),
        }
    }
}

/// Privileged capability checked immediately before each radio operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Scan,
    Connect,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Scan => write!(f, "scan"),
            Capability::Connect => write!(f, "connect"),
        }
    }
}

/// Power state of the local radio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdapterStatus {
    PoweredOn,
    PoweredOff,
    Absent,
}

impl fmt::Display for AdapterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterStatus::PoweredOn => write!(f, "powered on"),
            AdapterStatus::PoweredOff => write!(f, "powered off"),
            AdapterStatus::Absent => write!(f, "absent"),
        }
    }
}

/// Result of a service discovery pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscoveryOutcome {
    /// Well-known service and data characteristic both resolved
    Resolved,
    /// Well-known service absent; hardware identity mismatch
    ServiceMissing,
    /// Service present but the data characteristic is absent
    CharacteristicMissing,
}

/// Stack operation a settle timer is guarding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlePoint {
    /// Wait between transport connect and the MTU request
    MtuRequest,
    /// Wait between the MTU result and service discovery
    ServiceDiscovery,
}

impl fmt::Display for SettlePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlePoint::MtuRequest => write!(f, "mtu-request"),
            SettlePoint::ServiceDiscovery => write!(f, "service-discovery"),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
