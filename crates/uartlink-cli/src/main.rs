//! uartlink CLI - link the BLE UART bridge and stream it to the terminal

use clap::Parser;
use tracing::debug;

use uartlink_cli::{cli::Cli, commands::CommandDispatcher, config::AppConfig, error::Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    setup_logging(cli.verbose);

    // Load configuration
    let config = load_configuration(&cli)?;

    // Execute the command
    CommandDispatcher::execute(cli, config).await?;

    debug!("uartlink exited");
    Ok(())
}

/// Setup logging based on verbosity level
///
/// Diagnostics go to stderr; stdout carries only the status, signal, and
/// data lines of the stream itself.
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from file or use defaults
fn load_configuration(cli: &Cli) -> Result<AppConfig> {
    if let Some(config_path) = &cli.config {
        debug!("Loading configuration from: {}", config_path.display());
    }
    AppConfig::load(cli.config.as_deref())
}
