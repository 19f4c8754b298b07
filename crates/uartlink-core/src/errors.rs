//! Scan failure taxonomy
//!
//! Platform scanners report failures with vendor codes. One code is special:
//! scanner registration exhaustion, which no in-process action can clear.
//! The user has to power-cycle the radio, so it must stay distinguishable
//! from ordinary failures all the way to the consumer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// A scan failure reported by the platform stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ScanFailure {
    /// Scanner registrations exhausted; only a manual radio power-cycle clears it
    #[error("scan registration exhausted (code {})", ScanFailure::STACK_EXHAUSTED_CODE)]
    StackExhausted,

    /// Any other vendor failure code
    #[error("scan failed with code {0}")]
    Failed(i32),
}

impl ScanFailure {
    /// Vendor code for scanner registration exhaustion
    pub const STACK_EXHAUSTED_CODE: i32 = 2;

    /// Classify a raw vendor code
    pub fn from_code(code: i32) -> Self {
        if code == Self::STACK_EXHAUSTED_CODE {
            ScanFailure::StackExhausted
        } else {
            ScanFailure::Failed(code)
        }
    }

    /// The raw vendor code
    pub fn code(&self) -> i32 {
        match self {
            ScanFailure::StackExhausted => Self::STACK_EXHAUSTED_CODE,
            ScanFailure::Failed(code) => *code,
        }
    }

    /// Whether recovery requires the user to power-cycle the radio
    pub fn requires_manual_reset(&self) -> bool {
        matches!(self, ScanFailure::StackExhausted)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
