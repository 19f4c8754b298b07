//! Command handlers for the uartlink CLI

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};
use uartlink_core::StatusReport;

use crate::app::StreamApp;
use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::error::Result;
use crate::export;

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(cli: Cli, config: AppConfig) -> Result<()> {
        match cli.command {
            Commands::Stream {
                timeout_secs,
                export,
            } => Self::handle_stream_command(config, timeout_secs, export).await,
            Commands::Settings => Self::handle_settings_command(),
            Commands::ConfigPath => Self::handle_config_path_command(cli.config.as_deref()),
        }
    }

    /// Handle the stream command
    async fn handle_stream_command(
        config: AppConfig,
        timeout_secs: Option<u64>,
        export_requested: bool,
    ) -> Result<()> {
        let mut link_config = config.link.clone();
        if let Some(secs) = timeout_secs {
            link_config = link_config.with_scan_timeout(Duration::from_secs(secs));
        }

        let mut app = StreamApp::new(link_config).await?;
        app.run().await?;

        if export_requested {
            Self::export_capture(&mut app, &config)?;
        }

        Ok(())
    }

    /// Write the lines captured during a run to a trace file
    fn export_capture(app: &mut StreamApp, config: &AppConfig) -> Result<()> {
        let lines = app.take_captured();
        if lines.is_empty() {
            info!("Nothing captured; skipping export");
            return Ok(());
        }

        let content = lines.join("\n") + "\n";
        let file_name = export::trace_file_name();
        let path = export::save_file(&content, &file_name, config.export.directory.as_deref())?;
        debug!("Capture written to {}", path.display());
        println!("Exported: {}", file_name);

        Ok(())
    }

    /// Handle the settings command
    fn handle_settings_command() -> Result<()> {
        // Opening the system settings page must work even when the radio
        // itself is broken, so this bypasses the driver entirely.
        uartlink_ble::open_bluetooth_settings()?;
        println!("{}", StatusReport::manual_radio_reset());
        Ok(())
    }

    /// Handle the config-path command
    fn handle_config_path_command(override_path: Option<&Path>) -> Result<()> {
        if let Some(path) = override_path {
            println!("{}", path.display());
            return Ok(());
        }

        match AppConfig::default_config_path() {
            Some(path) if path.exists() => println!("{}", path.display()),
            Some(path) => println!("{} (not present; defaults in use)", path.display()),
            None => println!("No configuration directory on this platform; defaults in use."),
        }

        Ok(())
    }
}
