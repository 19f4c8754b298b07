//! Advertised-name match filter
//!
//! The scanner applies this predicate to every advertisement. Matching is a
//! case-sensitive substring test against a fixed allow-list of tokens; the
//! first match wins and stops the scan. No RSSI ranking is performed.

use serde::{Deserialize, Serialize};

/// Name tokens the bridge hardware advertises under
pub const DEFAULT_NAME_TOKENS: [&str; 3] = ["OSM", "ESP32", "CAN"];

/// Immutable predicate over a device's advertised name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameFilter {
    tokens: Vec<String>,
}

impl NameFilter {
    /// Build a filter from an explicit token list
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Case-sensitive substring match against the allow-list
    pub fn matches(&self, name: &str) -> bool {
        self.tokens.iter().any(|token| name.contains(token.as_str()))
    }

    /// The allow-list tokens
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl Default for NameFilter {
    fn default() -> Self {
        Self::new(DEFAULT_NAME_TOKENS)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
