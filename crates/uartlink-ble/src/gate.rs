//! Capability and adapter gates guarding privileged radio operations
//!
//! Authorization can be revoked while a session is live, so the driver asks
//! the [`CapabilityGate`] immediately before every privileged operation
//! rather than once at session start. The [`AdapterGate`] answers for radio
//! power state, the enable flow, and the settings page.

use async_trait::async_trait;
use btleplug::api::{Central, CentralState};
use btleplug::platform::Adapter;
use uartlink_core::{AdapterStatus, Capability};

use crate::error::RadioError;
use crate::settings;

// ----------------------------------------------------------------------------
// Capability Gate
// ----------------------------------------------------------------------------

/// Point-of-use authorization check for privileged radio operations
pub trait CapabilityGate: Send + Sync {
    /// Whether the given capability is currently granted
    fn authorized(&self, capability: Capability) -> bool;
}

/// Fixed capability grants
///
/// Desktop platforms do not revoke Bluetooth authorization per operation;
/// this gate answers from a fixed grant set. Scripted gates in tests model
/// revocation mid-session.
#[derive(Debug, Clone, Copy)]
pub struct StaticGate {
    scan: bool,
    connect: bool,
}

impl StaticGate {
    /// Gate granting exactly the given capabilities
    pub fn granting(scan: bool, connect: bool) -> Self {
        Self { scan, connect }
    }
}

impl Default for StaticGate {
    fn default() -> Self {
        Self {
            scan: true,
            connect: true,
        }
    }
}

impl CapabilityGate for StaticGate {
    fn authorized(&self, capability: Capability) -> bool {
        match capability {
            Capability::Scan => self.scan,
            Capability::Connect => self.connect,
        }
    }
}

// ----------------------------------------------------------------------------
// Adapter Gate
// ----------------------------------------------------------------------------

/// Radio power state queries and the enable flow
#[async_trait]
pub trait AdapterGate: Send + Sync {
    /// Current power state of the local radio
    async fn status(&self) -> Result<AdapterStatus, RadioError>;

    /// Ask for the radio to be enabled; `true` means it is now usable
    async fn request_enable(&self) -> Result<bool, RadioError>;

    /// Open the platform Bluetooth settings page
    fn open_settings(&self) -> Result<(), RadioError>;
}

/// Adapter gate backed by the btleplug adapter
pub struct BtleAdapterGate {
    adapter: Adapter,
}

impl BtleAdapterGate {
    pub fn new(adapter: Adapter) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl AdapterGate for BtleAdapterGate {
    async fn status(&self) -> Result<AdapterStatus, RadioError> {
        let state = self
            .adapter
            .adapter_state()
            .await
            .map_err(|e| RadioError::AdapterStateUnavailable(e.to_string()))?;
        Ok(match state {
            CentralState::PoweredOn => AdapterStatus::PoweredOn,
            CentralState::PoweredOff => AdapterStatus::PoweredOff,
            // Unknown is what the platform reports before its first state
            // callback.
            _ => AdapterStatus::PoweredOn,
        })
    }

    async fn request_enable(&self) -> Result<bool, RadioError> {
        // Powering the radio is a user action outside this process on
        // desktop platforms; the request re-checks whether it happened.
        Ok(self.status().await? == AdapterStatus::PoweredOn)
    }

    fn open_settings(&self) -> Result<(), RadioError> {
        settings::open_bluetooth_settings()
    }
}
