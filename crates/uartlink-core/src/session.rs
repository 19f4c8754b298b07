//! Link Session State Machine
//!
//! Provides serialized lifecycle management for a single bridge link. Every
//! transport callback, timer expiry, and command is reduced to a
//! [`SessionEvent`] and applied to the one live [`LinkSession`]; the session
//! answers with the emissions and effects the driver must carry out, so the
//! machine itself never touches the radio.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::channel::{AppEvent, ConnectionSignal, Effect, SettlePoint};
use crate::config::LinkConfig;
use crate::errors::ScanFailure;
use crate::frame;
use crate::status::StatusReport;

// ----------------------------------------------------------------------------
// Session Identity
// ----------------------------------------------------------------------------

/// Monotonic identity distinguishing one link attempt from the next
///
/// Every transport callback and timer is stamped with the identity of the
/// session that scheduled it. A stamp that no longer matches the live session
/// marks the event as stale, and stale events are dropped before they reach
/// the state machine. Identity alone is not enough: a session can return to
/// `Idle` without changing identity (unsolicited loss), so the machine also
/// rejects events that do not apply to the current phase.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct SessionId(u64);

impl SessionId {
    /// Identity before any session has started; never used by a live session
    pub fn initial() -> Self {
        SessionId(0)
    }

    /// The identity the next session will carry
    pub fn next(self) -> Self {
        SessionId(self.0 + 1)
    }

    /// Raw counter value
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Link Phase
// ----------------------------------------------------------------------------

/// Phase of the link lifecycle
///
/// The happy path runs top to bottom; `Error` absorbs failed sessions until
/// the next disconnect command resets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkPhase {
    /// No session activity
    Idle,
    /// Discovery pass running with the name filter armed
    Scanning,
    /// Connection attempt to the matched device in flight
    Connecting,
    /// Connected; waiting out the settle delay, then the MTU exchange
    MtuNegotiating,
    /// MTU settled; waiting out the settle delay, then service discovery
    DiscoveringServices,
    /// Notification subscription being dispatched
    Subscribing,
    /// Live stream relaying notification frames
    Streaming,
    /// Teardown in progress
    Disconnecting,
    /// Session failed; only a disconnect command leaves this phase
    Error,
}

impl LinkPhase {
    /// Phase name for logging
    pub fn name(&self) -> &'static str {
        match self {
            LinkPhase::Idle => "Idle",
            LinkPhase::Scanning => "Scanning",
            LinkPhase::Connecting => "Connecting",
            LinkPhase::MtuNegotiating => "MtuNegotiating",
            LinkPhase::DiscoveringServices => "DiscoveringServices",
            LinkPhase::Subscribing => "Subscribing",
            LinkPhase::Streaming => "Streaming",
            LinkPhase::Disconnecting => "Disconnecting",
            LinkPhase::Error => "Error",
        }
    }
}

// ----------------------------------------------------------------------------
// Session Events
// ----------------------------------------------------------------------------

/// Events that drive session transitions
///
/// One enumeration covers commands, transport callbacks, and timers, so the
/// machine never cares how the platform delivered an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// Begin a fresh link attempt
    Start,
    /// Consumer requested teardown
    Disconnect,
    /// Teardown finished; resources are released
    Closed,
    /// First advertisement whose name passed the filter
    ScanMatched { name: String },
    /// Scan window elapsed without a match
    ScanTimedOut,
    /// Platform reported a scan failure
    ScanFailed(ScanFailure),
    /// Connection to the matched device is up
    Connected,
    /// Settle delay after connect elapsed; the MTU request may go out
    MtuSettleElapsed,
    /// MTU exchange concluded with the granted value
    MtuChanged { mtu: u16 },
    /// Settle delay after the MTU result elapsed; discovery may go out
    DiscoverySettleElapsed,
    /// Well-known service and data characteristic both resolved
    ServicesResolved,
    /// Well-known service or data characteristic absent
    ServiceMissing,
    /// Client-configuration write for notifications was dispatched
    SubscriptionDispatched,
    /// Notification subscription could not be dispatched
    SubscriptionFailed { reason: String },
    /// Notification payload from the data characteristic
    FrameReceived { payload: Vec<u8> },
    /// The transport dropped the link unsolicited
    LinkLost,
}

// ----------------------------------------------------------------------------
// Transition Results
// ----------------------------------------------------------------------------

/// Result of applying one event to the session
///
/// Emissions are dispatched to the consumer before effects run, in the order
/// given; neither list is ever reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Consumer-facing emissions, in emission order
    pub emissions: Vec<AppEvent>,
    /// External side effects for the driver to execute, in order
    pub effects: Vec<Effect>,
}

// ----------------------------------------------------------------------------
// State Machine Implementation
// ----------------------------------------------------------------------------

/// The single live link session
///
/// Owned exclusively by the driver; [`LinkSession::apply`] is the only
/// mutation path, so concurrent callbacks can never interleave destructively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSession {
    id: SessionId,
    phase: LinkPhase,
    negotiated_mtu: Option<u16>,
    matched_name: Option<String>,
    config: LinkConfig,
}

impl LinkSession {
    /// Create an idle session with the given policy constants
    pub fn new(config: LinkConfig) -> Self {
        Self {
            id: SessionId::initial(),
            phase: LinkPhase::Idle,
            negotiated_mtu: None,
            matched_name: None,
            config,
        }
    }

    /// Identity of the current link attempt
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> LinkPhase {
        self.phase
    }

    /// MTU granted by the peripheral, once the exchange has concluded
    pub fn negotiated_mtu(&self) -> Option<u16> {
        self.negotiated_mtu
    }

    /// Advertised name of the matched device, once a match has arrived
    pub fn matched_name(&self) -> Option<&str> {
        self.matched_name.as_deref()
    }

    /// Policy constants this session runs under
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Whether no session activity is in progress
    pub fn is_idle(&self) -> bool {
        self.phase == LinkPhase::Idle
    }

    /// Apply one event, returning the emissions and effects it produced
    ///
    /// Events that do not apply to the current phase return [`IgnoredEvent`]
    /// and leave the session untouched. That is the phase half of the
    /// stale-event defense; the driver's identity check is the other half.
    pub fn apply(&mut self, event: SessionEvent) -> Result<Transition, IgnoredEvent> {
        match (self.phase, event) {
            // From Idle
            (LinkPhase::Idle, SessionEvent::Start) => {
                self.id = self.id.next();
                self.phase = LinkPhase::Scanning;
                self.negotiated_mtu = None;
                self.matched_name = None;
                Ok(Transition {
                    emissions: vec![AppEvent::Status(StatusReport::scan_started())],
                    effects: vec![
                        Effect::StartScan,
                        Effect::ArmScanTimeout {
                            delay: self.config.scan_timeout,
                        },
                    ],
                })
            }

            // From Scanning
            (LinkPhase::Scanning, SessionEvent::ScanMatched { name }) => {
                self.phase = LinkPhase::Connecting;
                let emissions = vec![
                    AppEvent::Status(StatusReport::matched(&name)),
                    AppEvent::Status(StatusReport::contacting_hardware()),
                ];
                self.matched_name = Some(name);
                Ok(Transition {
                    emissions,
                    effects: vec![Effect::StopScan, Effect::Connect],
                })
            }

            (LinkPhase::Scanning, SessionEvent::ScanTimedOut) => {
                self.phase = LinkPhase::Idle;
                Ok(Transition {
                    emissions: vec![
                        AppEvent::Status(StatusReport::scan_timeout(self.config.scan_timeout)),
                        AppEvent::Connection(ConnectionSignal::Disconnected),
                    ],
                    effects: vec![Effect::StopScan],
                })
            }

            (LinkPhase::Scanning, SessionEvent::ScanFailed(failure)) => {
                self.phase = LinkPhase::Idle;
                Ok(Transition {
                    emissions: vec![
                        AppEvent::Status(StatusReport::scan_failed(&failure)),
                        AppEvent::Connection(ConnectionSignal::Error),
                    ],
                    effects: vec![Effect::StopScan],
                })
            }

            // From Connecting
            (LinkPhase::Connecting, SessionEvent::Connected) => {
                self.phase = LinkPhase::MtuNegotiating;
                Ok(Transition {
                    emissions: vec![AppEvent::Status(StatusReport::handshake_initiated())],
                    effects: vec![Effect::ArmSettleTimer {
                        point: SettlePoint::MtuRequest,
                        delay: self.config.mtu_settle_delay,
                    }],
                })
            }

            // From MtuNegotiating
            (LinkPhase::MtuNegotiating, SessionEvent::MtuSettleElapsed) => Ok(Transition {
                emissions: Vec::new(),
                effects: vec![Effect::RequestMtu {
                    target: self.config.target_mtu,
                }],
            }),

            (LinkPhase::MtuNegotiating, SessionEvent::MtuChanged { mtu }) => {
                // The granted value is accepted as-is, even when smaller
                // than the requested target.
                self.phase = LinkPhase::DiscoveringServices;
                self.negotiated_mtu = Some(mtu);
                Ok(Transition {
                    emissions: vec![AppEvent::Status(StatusReport::mtu_synced(mtu))],
                    effects: vec![Effect::ArmSettleTimer {
                        point: SettlePoint::ServiceDiscovery,
                        delay: self.config.discovery_settle_delay,
                    }],
                })
            }

            // From DiscoveringServices
            (LinkPhase::DiscoveringServices, SessionEvent::DiscoverySettleElapsed) => {
                Ok(Transition {
                    emissions: Vec::new(),
                    effects: vec![Effect::DiscoverServices],
                })
            }

            (LinkPhase::DiscoveringServices, SessionEvent::ServicesResolved) => {
                self.phase = LinkPhase::Subscribing;
                Ok(Transition {
                    emissions: Vec::new(),
                    effects: vec![Effect::Subscribe],
                })
            }

            (LinkPhase::DiscoveringServices, SessionEvent::ServiceMissing) => {
                self.phase = LinkPhase::Error;
                Ok(Transition {
                    emissions: vec![
                        AppEvent::Status(StatusReport::service_missing()),
                        AppEvent::Connection(ConnectionSignal::Error),
                    ],
                    effects: vec![Effect::TearDownTransport],
                })
            }

            // From Subscribing
            (LinkPhase::Subscribing, SessionEvent::SubscriptionDispatched) => {
                // Descriptor dispatch is treated as subscription success;
                // the stream is reported live without waiting for a write
                // acknowledgement.
                self.phase = LinkPhase::Streaming;
                Ok(Transition {
                    emissions: vec![
                        AppEvent::Status(StatusReport::stream_active()),
                        AppEvent::Connection(ConnectionSignal::Connected),
                    ],
                    effects: Vec::new(),
                })
            }

            (LinkPhase::Subscribing, SessionEvent::SubscriptionFailed { reason }) => {
                self.phase = LinkPhase::Error;
                Ok(Transition {
                    emissions: vec![
                        AppEvent::Status(StatusReport::exception(&reason)),
                        AppEvent::Connection(ConnectionSignal::Error),
                    ],
                    effects: vec![Effect::TearDownTransport],
                })
            }

            // From Streaming
            (LinkPhase::Streaming, SessionEvent::FrameReceived { payload }) => Ok(Transition {
                emissions: vec![AppEvent::Data(frame::sanitize(&payload))],
                effects: Vec::new(),
            }),

            // Unsolicited transport loss, anywhere from connect to stream
            (
                LinkPhase::Connecting
                | LinkPhase::MtuNegotiating
                | LinkPhase::DiscoveringServices
                | LinkPhase::Subscribing
                | LinkPhase::Streaming,
                SessionEvent::LinkLost,
            ) => {
                self.phase = LinkPhase::Idle;
                self.negotiated_mtu = None;
                self.matched_name = None;
                Ok(Transition {
                    emissions: vec![
                        AppEvent::Status(StatusReport::link_terminated()),
                        AppEvent::Connection(ConnectionSignal::Disconnected),
                    ],
                    effects: vec![Effect::TearDownTransport],
                })
            }

            // Universal transitions
            (phase, SessionEvent::Disconnect) => {
                let effects = match phase {
                    LinkPhase::Scanning => vec![Effect::StopScan],
                    LinkPhase::Connecting
                    | LinkPhase::MtuNegotiating
                    | LinkPhase::DiscoveringServices
                    | LinkPhase::Subscribing
                    | LinkPhase::Streaming => vec![Effect::TearDownTransport],
                    LinkPhase::Idle | LinkPhase::Disconnecting | LinkPhase::Error => Vec::new(),
                };
                self.phase = LinkPhase::Disconnecting;
                Ok(Transition {
                    emissions: Vec::new(),
                    effects,
                })
            }

            (LinkPhase::Disconnecting, SessionEvent::Closed) => {
                self.phase = LinkPhase::Idle;
                self.negotiated_mtu = None;
                self.matched_name = None;
                Ok(Transition {
                    emissions: vec![
                        AppEvent::Status(StatusReport::resources_purged()),
                        AppEvent::Connection(ConnectionSignal::Disconnected),
                    ],
                    effects: Vec::new(),
                })
            }

            // Events that do not apply to the current phase
            (phase, event) => Err(IgnoredEvent {
                phase: phase.name(),
                event: format!("{:?}", event),
            }),
        }
    }
}

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// A delivered event that does not apply to the session's current phase
///
/// Raced timers and late callbacks land here; the caller logs and drops them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event {event} ignored in phase {phase}")]
pub struct IgnoredEvent {
    /// Phase the session was in when the event arrived
    pub phase: &'static str,
    /// The ignored event
    pub event: String,
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
