//! Core protocol logic for the uartlink BLE bridge
//!
//! This crate owns everything that can be reasoned about without a radio:
//! the link lifecycle state machine, the channel message vocabulary the
//! driver and consumer speak, the consumer-facing status catalog, the
//! advertisement name filter, and frame sanitization. All of it is
//! deterministic and unit testable; the btleplug-backed transport lives in
//! `uartlink-ble`.
//!
//! ## Architecture
//!
//! - [`channel`] - Commands, transport events, effects, and app events
//! - [`config`] - Link policy constants (timeouts, settle delays, MTU target)
//! - [`errors`] - Scan failure taxonomy
//! - [`filter`] - Advertised-name match filter
//! - [`frame`] - Notification payload sanitization
//! - [`session`] - The link lifecycle state machine
//! - [`status`] - Tagged status reports delivered to the consumer

pub mod channel;
pub mod config;
pub mod errors;
pub mod filter;
pub mod frame;
pub mod session;
pub mod status;

// Public API exports
pub use channel::{
    AdapterStatus, AppEvent, Capability, Command, ConnectionSignal, DiscoveryOutcome, Effect,
    LinkEvent, SettlePoint,
};
pub use config::LinkConfig;
pub use errors::ScanFailure;
pub use filter::NameFilter;
pub use session::{IgnoredEvent, LinkPhase, LinkSession, SessionEvent, SessionId, Transition};
pub use status::{StatusKind, StatusReport};
