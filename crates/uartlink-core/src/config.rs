//! Link policy configuration
//!
//! The lifecycle's timing behavior is governed by fixed policy constants,
//! not by anything negotiated on the wire. The two settle delays exist to
//! work around known instability in some platform BLE stacks when a
//! dependent operation is issued immediately after the one before it; they
//! are deliberate waits, not protocol requirements. All of them are
//! injectable here so tests can shrink or stretch them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::filter::{NameFilter, DEFAULT_NAME_TOKENS};

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Policy constants for one link lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Scan window; the pass is aborted when it elapses without a match
    pub scan_timeout: Duration,
    /// Maximum time to wait for the transport connect to complete
    pub connection_timeout: Duration,
    /// Wait between transport connect and the MTU request
    pub mtu_settle_delay: Duration,
    /// Wait between the MTU result and service discovery
    pub discovery_settle_delay: Duration,
    /// MTU size to request; whatever the peripheral grants is accepted as-is
    pub target_mtu: u16,
    /// Advertised-name tokens identifying the bridge hardware
    pub name_tokens: Vec<String>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            scan_timeout: Duration::from_millis(20_000),
            connection_timeout: Duration::from_secs(10),
            mtu_settle_delay: Duration::from_millis(1_000),
            discovery_settle_delay: Duration::from_millis(600),
            target_mtu: 512,
            name_tokens: DEFAULT_NAME_TOKENS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LinkConfig {
    /// Create a new configuration with default policy constants
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan window
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Set the transport connect timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the wait between connect and the MTU request
    pub fn with_mtu_settle_delay(mut self, delay: Duration) -> Self {
        self.mtu_settle_delay = delay;
        self
    }

    /// Set the wait between the MTU result and service discovery
    pub fn with_discovery_settle_delay(mut self, delay: Duration) -> Self {
        self.discovery_settle_delay = delay;
        self
    }

    /// Set the MTU size to request
    pub fn with_target_mtu(mut self, target: u16) -> Self {
        self.target_mtu = target;
        self
    }

    /// Set the advertised-name tokens
    pub fn with_name_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.name_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// The advertisement filter these tokens describe
    pub fn filter(&self) -> NameFilter {
        NameFilter::new(self.name_tokens.iter().cloned())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
