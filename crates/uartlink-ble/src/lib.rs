//! Bluetooth Low Energy link driver for uartlink
//!
//! This crate connects the pure lifecycle machine from `uartlink-core` to a
//! real radio. A single driver task owns the session and executes its
//! transitions; a btleplug-backed radio carries out the privileged
//! operations and reports their outcomes back as session-stamped events.
//!
//! ## Architecture
//!
//! The driver is organized into several modules:
//!
//! - [`driver`] - The serialized execution context that owns the session
//! - [`radio`] - The radio dispatch seam and its btleplug implementation
//! - [`gate`] - Capability and adapter-power gates for privileged operations
//! - [`protocol`] - UART service identifiers and link parameters
//! - [`settings`] - Platform Bluetooth settings launcher
//! - [`error`] - Error types specific to the radio backend
//!
//! ## Usage
//!
//! ```rust,no_run
//! use uartlink_ble::{event_channel, initialize_adapter, spawn_driver};
//! use uartlink_ble::{BtleAdapterGate, BtleRadio, StaticGate};
//! use uartlink_core::{Command, LinkConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LinkConfig::default();
//! let adapter = initialize_adapter().await?;
//!
//! let (events_tx, events_rx) = event_channel();
//! let radio = BtleRadio::new(adapter.clone(), &config, events_tx);
//! let mut handle = spawn_driver(
//!     radio,
//!     StaticGate::default(),
//!     BtleAdapterGate::new(adapter),
//!     config,
//!     events_rx,
//! );
//!
//! // Scan for the bridge, link it, and print everything it emits
//! handle.commands.send(Command::StartLink).await?;
//! while let Some(event) = handle.app_events.recv().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Support
//!
//! Central-mode scanning, connection, and notification subscription work on
//! Linux (BlueZ), macOS (Core Bluetooth), and Windows via btleplug. The MTU
//! exchange is performed by the platform stack during connection setup; see
//! [`protocol::EFFECTIVE_ATT_PAYLOAD`].

mod driver;
mod error;
mod gate;
mod protocol;
mod radio;
mod settings;

// Public API exports
pub use driver::{event_channel, spawn_driver, DriverHandle, LinkDriver};
pub use error::RadioError;
pub use gate::{AdapterGate, BtleAdapterGate, CapabilityGate, StaticGate};
pub use protocol::{
    CLIENT_CHARACTERISTIC_CONFIG_UUID, EFFECTIVE_ATT_PAYLOAD, UART_SERVICE_UUID,
    UART_TX_CHARACTERISTIC_UUID,
};
pub use radio::{initialize_adapter, BtleRadio, Radio};
pub use settings::open_bluetooth_settings;

// Re-export the consumer-facing vocabulary for convenience
pub use uartlink_core::{AppEvent, Command, LinkConfig};
