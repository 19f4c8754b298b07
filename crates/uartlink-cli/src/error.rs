//! Error handling for the uartlink CLI

use thiserror::Error;
use tokio::sync::mpsc;
use uartlink_core::Command;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Radio error: {0}")]
    Radio(#[from] uartlink_ble::RadioError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Link driver is no longer running")]
    DriverClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Config(err.to_string())
    }
}

impl From<mpsc::error::SendError<Command>> for CliError {
    fn from(_: mpsc::error::SendError<Command>) -> Self {
        CliError::DriverClosed
    }
}
