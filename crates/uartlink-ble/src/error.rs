//! Error types for the BLE link driver

use thiserror::Error;
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors raised by the radio backend and adapter plumbing
#[derive(Error, Debug)]
pub enum RadioError {
    #[error("Failed to create BLE manager: {0}")]
    ManagerUnavailable(String),

    #[error("BLE adapter not available")]
    AdapterNotAvailable,

    #[error("Failed to query adapter state: {0}")]
    AdapterStateUnavailable(String),

    #[error("Failed to get BLE events: {0}")]
    EventStreamFailed(String),

    #[error("Failed to start BLE scan: {0}")]
    ScanStartFailed(String),

    #[error("Failed to stop BLE scan: {0}")]
    ScanStopFailed(String),

    #[error("No matched peripheral to operate on")]
    NoMatchedPeripheral,

    #[error("Characteristic not resolved: {characteristic}")]
    CharacteristicNotFound { characteristic: Uuid },

    #[error("Failed to open Bluetooth settings: {0}")]
    SettingsUnavailable(String),
}
