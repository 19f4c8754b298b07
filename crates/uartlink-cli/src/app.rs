//! Terminal stream consumer
//!
//! Wires the link driver to stdout. Status reports and connection signals
//! are printed as they arrive; data lines are printed and retained so a run
//! can be exported afterwards. Ctrl-C requests a disconnect and the loop
//! ends on the resulting disconnected signal.

use std::time::Duration;

use tokio::time::timeout;
use tracing::debug;
use uartlink_ble::{
    event_channel, initialize_adapter, spawn_driver, BtleAdapterGate, BtleRadio, DriverHandle,
    StaticGate,
};
use uartlink_core::{AppEvent, Command, ConnectionSignal, LinkConfig, StatusKind};

use crate::error::Result;

/// How long to wait for emissions still queued behind a terminal status
const TAIL_DRAIN_WINDOW: Duration = Duration::from_millis(250);

// ----------------------------------------------------------------------------
// Stream application
// ----------------------------------------------------------------------------

/// One streaming run against a BLE serial bridge
pub struct StreamApp {
    handle: DriverHandle,
    captured: Vec<String>,
}

impl StreamApp {
    /// Bring up the BLE stack and spawn the link driver
    pub async fn new(config: LinkConfig) -> Result<Self> {
        let adapter = initialize_adapter().await?;
        let (events_tx, events_rx) = event_channel();
        let radio = BtleRadio::new(adapter.clone(), &config, events_tx);
        let handle = spawn_driver(
            radio,
            StaticGate::default(),
            BtleAdapterGate::new(adapter),
            config,
            events_rx,
        );

        Ok(Self {
            handle,
            captured: Vec::new(),
        })
    }

    /// Run one link attempt to completion
    pub async fn run(&mut self) -> Result<()> {
        self.handle.commands.send(Command::StartLink).await?;

        // Starting a link always purges the previous session first, which
        // surfaces as one disconnected signal before scanning begins. That
        // one does not end the run.
        let mut start_purge_pending = true;
        let mut stack_exhausted = false;

        loop {
            tokio::select! {
                event = self.handle.app_events.recv() => {
                    let Some(event) = event else { break };
                    match event {
                        AppEvent::Status(report) => {
                            println!("{}", report);
                            if report.kind == StatusKind::ScanFailed
                                && report.text.starts_with("Code 2")
                            {
                                stack_exhausted = true;
                            }
                            if Self::ends_the_run(report.kind) {
                                self.drain_tail().await;
                                break;
                            }
                        }
                        AppEvent::Connection(signal) => {
                            println!("[{}]", signal);
                            match signal {
                                ConnectionSignal::Connected => {}
                                ConnectionSignal::Disconnected if start_purge_pending => {
                                    start_purge_pending = false;
                                }
                                ConnectionSignal::Disconnected | ConnectionSignal::Error => break,
                            }
                        }
                        AppEvent::Data(line) => {
                            println!("{}", line);
                            self.captured.push(line);
                        }
                    }
                }
                interrupt = tokio::signal::ctrl_c() => {
                    interrupt?;
                    debug!("Interrupt received; tearing the link down");
                    self.handle.commands.send(Command::Disconnect).await?;
                }
            }
        }

        if stack_exhausted {
            eprintln!(
                "The scan stack needs a manual reset; run `uartlink settings` \
                 and toggle Bluetooth off and on."
            );
        }

        Ok(())
    }

    /// Lines of stream data received during the run
    pub fn captured_lines(&self) -> &[String] {
        &self.captured
    }

    /// Hand the captured lines over, leaving the buffer empty
    pub fn take_captured(&mut self) -> Vec<String> {
        std::mem::take(&mut self.captured)
    }

    fn ends_the_run(kind: StatusKind) -> bool {
        matches!(
            kind,
            StatusKind::Error
                | StatusKind::Exception
                | StatusKind::PermissionDenied
                | StatusKind::ScanFailed
        )
    }

    /// Print whatever is still queued behind a terminal status
    async fn drain_tail(&mut self) {
        while let Ok(Some(event)) = timeout(TAIL_DRAIN_WINDOW, self.handle.app_events.recv()).await
        {
            match event {
                AppEvent::Status(report) => println!("{}", report),
                AppEvent::Connection(signal) => println!("[{}]", signal),
                AppEvent::Data(line) => {
                    println!("{}", line);
                    self.captured.push(line);
                }
            }
        }
    }
}
