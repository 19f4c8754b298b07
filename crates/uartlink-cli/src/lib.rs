//! uartlink CLI library
//!
//! Command-line front end for the uartlink BLE bridge: argument parsing,
//! configuration loading, the terminal stream consumer, and trace export.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;

pub use app::StreamApp;
pub use cli::{Cli, Commands};
pub use config::{AppConfig, ExportConfig};
pub use error::{CliError, Result};

// Re-export commonly used types
pub use uartlink_core::{AppEvent, Command, LinkConfig};
