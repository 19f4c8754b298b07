//! Link driver: the serialized execution context for the session
//!
//! One task owns the [`LinkSession`] and everything that mutates it.
//! Commands, transport events, and timer expiries all funnel into the same
//! `select!` loop, so concurrent scan results, callbacks, and consumer calls
//! can never interleave destructively. Stale deliveries are filtered twice:
//! the driver drops events stamped with a superseded session identity, and
//! the machine rejects events that do not apply to the current phase.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uartlink_core::{
    AdapterStatus, AppEvent, Capability, Command, DiscoveryOutcome, Effect, LinkConfig, LinkEvent,
    LinkSession, SessionEvent, SessionId, SettlePoint, StatusReport,
};

use crate::gate::{AdapterGate, CapabilityGate};
use crate::radio::Radio;

/// Command channel capacity
const COMMAND_BUFFER: usize = 16;

/// Transport event channel capacity
const LINK_EVENT_BUFFER: usize = 64;

/// Timer expiry channel capacity
const TIMER_BUFFER: usize = 8;

// ----------------------------------------------------------------------------
// Timer Plumbing
// ----------------------------------------------------------------------------

/// Which armed timer fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerPoint {
    /// Scan window elapsed
    ScanWindow,
    /// A settle delay elapsed
    Settle(SettlePoint),
}

/// A timer expiry, stamped with the session that armed it
///
/// Timers are never cancelled when a session ends; a stale expiry is
/// filtered by its stamp, or by the phase check when the identity survived.
#[derive(Debug, Clone, Copy)]
struct TimerFired {
    session: SessionId,
    point: TimerPoint,
}

// ----------------------------------------------------------------------------
// Driver
// ----------------------------------------------------------------------------

/// Owns the live session and executes its transitions
pub struct LinkDriver<R, C, A>
where
    R: Radio,
    C: CapabilityGate,
    A: AdapterGate,
{
    session: LinkSession,
    radio: R,
    capability_gate: C,
    adapter_gate: A,
    commands: mpsc::Receiver<Command>,
    link_events: mpsc::Receiver<LinkEvent>,
    timer_tx: mpsc::Sender<TimerFired>,
    timers: mpsc::Receiver<TimerFired>,
    app_events: mpsc::UnboundedSender<AppEvent>,
}

impl<R, C, A> LinkDriver<R, C, A>
where
    R: Radio,
    C: CapabilityGate,
    A: AdapterGate,
{
    /// Run until the command surface is dropped
    pub async fn run(mut self) {
        info!("Link driver started");
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => break,
                    }
                }
                Some(event) = self.link_events.recv() => {
                    self.handle_link_event(event).await;
                }
                Some(timer) = self.timers.recv() => {
                    self.handle_timer(timer).await;
                }
            }
        }
        self.radio.tear_down().await;
        info!("Link driver stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        debug!(
            "Command {:?} in phase {}",
            command,
            self.session.phase().name()
        );
        match command {
            Command::StartLink => self.start_link().await,
            Command::Disconnect => self.teardown_session().await,
            Command::OpenRadioSettings => self.open_radio_settings(),
        }
    }

    /// Begin a fresh link attempt, superseding any running session
    async fn start_link(&mut self) {
        // Starting always tears the previous session down first, even from
        // idle, so a new session's callbacks are accepted only after the
        // old one can no longer act.
        self.teardown_session().await;

        match self.adapter_gate.status().await {
            Ok(AdapterStatus::PoweredOn) => {}
            Ok(AdapterStatus::PoweredOff) => {
                if !self.capability_gate.authorized(Capability::Connect) {
                    self.emit(AppEvent::Status(StatusReport::permission_missing(
                        Capability::Connect,
                    )));
                    return;
                }
                match self.adapter_gate.request_enable().await {
                    Ok(true) => {
                        self.emit(AppEvent::Status(StatusReport::bluetooth_authorized()));
                    }
                    Ok(false) => {
                        self.emit(AppEvent::Status(StatusReport::activation_denied()));
                        return;
                    }
                    Err(e) => {
                        warn!("Radio enable request failed: {}", e);
                        self.emit(AppEvent::Status(StatusReport::activation_denied()));
                        return;
                    }
                }
            }
            Ok(AdapterStatus::Absent) => {
                self.emit(AppEvent::Status(StatusReport::scanner_unavailable()));
                return;
            }
            Err(e) => {
                warn!("Adapter status query failed: {}", e);
                self.emit(AppEvent::Status(StatusReport::scanner_unavailable()));
                return;
            }
        }

        self.apply(SessionEvent::Start).await;
    }

    /// Tear down whatever the session holds; safe in every phase
    async fn teardown_session(&mut self) {
        self.apply(SessionEvent::Disconnect).await;
        self.apply(SessionEvent::Closed).await;
    }

    fn open_radio_settings(&mut self) {
        if let Err(e) = self.adapter_gate.open_settings() {
            warn!("Could not open Bluetooth settings: {}", e);
        }
        self.emit(AppEvent::Status(StatusReport::manual_radio_reset()));
    }

    async fn handle_link_event(&mut self, event: LinkEvent) {
        if event.session() != self.session.id() {
            debug!(
                "Dropping stale event from session {}: {:?}",
                event.session(),
                event
            );
            return;
        }

        let session_event = match event {
            LinkEvent::ScanMatch { name, .. } => SessionEvent::ScanMatched { name },
            LinkEvent::ScanFailed { failure, .. } => SessionEvent::ScanFailed(failure),
            LinkEvent::Connected { .. } => SessionEvent::Connected,
            LinkEvent::ConnectFailed { reason, .. } => {
                // No retry on a failed attempt; the session ends the same
                // way an established link ends.
                warn!("Connection attempt failed: {}", reason);
                SessionEvent::LinkLost
            }
            LinkEvent::MtuChanged { mtu, .. } => SessionEvent::MtuChanged { mtu },
            LinkEvent::ServicesDiscovered { outcome, .. } => match outcome {
                DiscoveryOutcome::Resolved => SessionEvent::ServicesResolved,
                DiscoveryOutcome::ServiceMissing | DiscoveryOutcome::CharacteristicMissing => {
                    warn!("Discovery failed: {:?}", outcome);
                    SessionEvent::ServiceMissing
                }
            },
            LinkEvent::SubscriptionDispatched { .. } => SessionEvent::SubscriptionDispatched,
            LinkEvent::SubscriptionFailed { reason, .. } => {
                SessionEvent::SubscriptionFailed { reason }
            }
            LinkEvent::Notification { payload, .. } => SessionEvent::FrameReceived { payload },
            LinkEvent::LinkLost { .. } => SessionEvent::LinkLost,
        };
        self.apply(session_event).await;
    }

    async fn handle_timer(&mut self, timer: TimerFired) {
        if timer.session != self.session.id() {
            debug!(
                "Dropping stale {:?} timer from session {}",
                timer.point, timer.session
            );
            return;
        }

        let event = match timer.point {
            TimerPoint::ScanWindow => SessionEvent::ScanTimedOut,
            TimerPoint::Settle(SettlePoint::MtuRequest) => SessionEvent::MtuSettleElapsed,
            TimerPoint::Settle(SettlePoint::ServiceDiscovery) => {
                SessionEvent::DiscoverySettleElapsed
            }
        };
        self.apply(event).await;
    }

    /// Apply one event to the machine, then carry out what it asked for
    async fn apply(&mut self, event: SessionEvent) {
        match self.session.apply(event) {
            Ok(transition) => {
                for emission in transition.emissions {
                    self.emit(emission);
                }
                for effect in transition.effects {
                    if !self.run_effect(effect).await {
                        break;
                    }
                }
            }
            Err(ignored) => {
                debug!("{}", ignored);
            }
        }
    }

    /// Execute one effect; `false` stops the rest of the plan
    async fn run_effect(&mut self, effect: Effect) -> bool {
        match effect {
            Effect::StartScan => {
                if !self.authorized(Capability::Scan) {
                    return false;
                }
                if let Err(e) = self.radio.start_scan(self.session.id()).await {
                    warn!("Scan start failed: {}", e);
                    self.emit(AppEvent::Status(StatusReport::exception(&e)));
                    // The scan-window timer is not armed after a failed
                    // start; only a new command moves the session on.
                    return false;
                }
                true
            }
            Effect::StopScan => {
                if !self.authorized(Capability::Scan) {
                    return true;
                }
                if let Err(e) = self.radio.stop_scan().await {
                    debug!("Scan stop failed: {}", e);
                }
                true
            }
            Effect::Connect => {
                if !self.authorized(Capability::Connect) {
                    return true;
                }
                if let Err(e) = self.radio.connect(self.session.id()).await {
                    warn!("Connect dispatch failed: {}", e);
                }
                true
            }
            Effect::RequestMtu { target } => {
                if !self.authorized(Capability::Connect) {
                    return true;
                }
                if let Err(e) = self.radio.request_mtu(self.session.id(), target).await {
                    warn!("MTU request failed: {}", e);
                }
                true
            }
            Effect::DiscoverServices => {
                if !self.authorized(Capability::Connect) {
                    return true;
                }
                if let Err(e) = self.radio.discover_services(self.session.id()).await {
                    warn!("Discovery dispatch failed: {}", e);
                }
                true
            }
            Effect::Subscribe => {
                if !self.authorized(Capability::Connect) {
                    return true;
                }
                if let Err(e) = self.radio.subscribe_notifications(self.session.id()).await {
                    warn!("Subscribe dispatch failed: {}", e);
                }
                true
            }
            Effect::TearDownTransport => {
                if !self.authorized(Capability::Connect) {
                    // Session cleanup still completes; only the radio call
                    // is skipped.
                    return true;
                }
                self.radio.tear_down().await;
                true
            }
            Effect::ArmScanTimeout { delay } => {
                self.arm_timer(TimerPoint::ScanWindow, delay);
                true
            }
            Effect::ArmSettleTimer { point, delay } => {
                self.arm_timer(TimerPoint::Settle(point), delay);
                true
            }
        }
    }

    /// Point-of-use capability check; a missing grant skips the operation
    fn authorized(&mut self, capability: Capability) -> bool {
        if self.capability_gate.authorized(capability) {
            return true;
        }
        warn!("Capability {} not granted; operation skipped", capability);
        self.emit(AppEvent::Status(StatusReport::permission_missing(
            capability,
        )));
        false
    }

    fn arm_timer(&self, point: TimerPoint, delay: Duration) {
        let session = self.session.id();
        let timer_tx = self.timer_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if timer_tx.send(TimerFired { session, point }).await.is_err() {
                debug!("Timer channel closed before {:?} fired", point);
            }
        });
    }

    /// Fire-and-forget delivery to the consumer; never blocks the driver
    fn emit(&self, event: AppEvent) {
        if self.app_events.send(event).is_err() {
            debug!("App event channel closed");
        }
    }
}

// ----------------------------------------------------------------------------
// Wiring
// ----------------------------------------------------------------------------

/// Consumer-side handle to a running driver
pub struct DriverHandle {
    /// Command surface into the driver
    pub commands: mpsc::Sender<Command>,
    /// Emission stream out of the driver, in emission order
    pub app_events: mpsc::UnboundedReceiver<AppEvent>,
}

/// Channel pair a radio backend reports into
pub fn event_channel() -> (mpsc::Sender<LinkEvent>, mpsc::Receiver<LinkEvent>) {
    mpsc::channel(LINK_EVENT_BUFFER)
}

/// Spawn a driver task over the given radio and gates
pub fn spawn_driver<R, C, A>(
    radio: R,
    capability_gate: C,
    adapter_gate: A,
    config: LinkConfig,
    link_events: mpsc::Receiver<LinkEvent>,
) -> DriverHandle
where
    R: Radio,
    C: CapabilityGate + 'static,
    A: AdapterGate + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (timer_tx, timer_rx) = mpsc::channel(TIMER_BUFFER);
    let (app_tx, app_rx) = mpsc::unbounded_channel();

    let driver = LinkDriver {
        session: LinkSession::new(config),
        radio,
        capability_gate,
        adapter_gate,
        commands: command_rx,
        link_events,
        timer_tx,
        timers: timer_rx,
        app_events: app_tx,
    };
    tokio::spawn(driver.run());

    DriverHandle {
        commands: command_tx,
        app_events: app_rx,
    }
}
