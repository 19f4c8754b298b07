//! Integration tests for the link driver
//!
//! These tests drive a [`LinkDriver`] end to end over a scripted radio and
//! adapter gate. The tokio clock is paused, so the scan window and the two
//! settle delays are exercised at their real durations without real waiting.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{sleep, timeout, Instant};
use tokio_test::assert_ok;

use uartlink_ble::{
    event_channel, spawn_driver, AdapterGate, DriverHandle, Radio, RadioError, StaticGate,
};
use uartlink_core::{
    AdapterStatus, AppEvent, Command, ConnectionSignal, DiscoveryOutcome, LinkConfig, LinkEvent,
    ScanFailure, SessionId, StatusKind, StatusReport,
};

// ----------------------------------------------------------------------------
// Scripted Radio
// ----------------------------------------------------------------------------

/// One privileged operation dispatched to the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RadioCall {
    StartScan,
    StopScan,
    Connect,
    RequestMtu(u16),
    DiscoverServices,
    Subscribe,
    TearDown,
}

/// Radio double answering every dispatch from a fixed script
///
/// Outcomes are sent from spawned tasks, like the real backend, so the
/// driver's select loop is what sequences them.
struct ScriptRadio {
    events: mpsc::Sender<LinkEvent>,
    calls: Arc<Mutex<Vec<RadioCall>>>,
    advertised_name: Option<String>,
    scan_start_error: Option<String>,
    granted_mtu: u16,
    discovery: DiscoveryOutcome,
    subscribe_error: Option<String>,
    hold_connect: bool,
    hold_discovery: bool,
}

impl ScriptRadio {
    fn new(events: mpsc::Sender<LinkEvent>) -> Self {
        Self {
            events,
            calls: Arc::new(Mutex::new(Vec::new())),
            advertised_name: Some("OSM-Bridge-01".to_string()),
            scan_start_error: None,
            granted_mtu: 244,
            discovery: DiscoveryOutcome::Resolved,
            subscribe_error: None,
            hold_connect: false,
            hold_discovery: false,
        }
    }

    /// Shared view of the dispatched calls
    fn calls_handle(&self) -> Arc<Mutex<Vec<RadioCall>>> {
        Arc::clone(&self.calls)
    }

    /// No advertisement ever passes the filter
    fn silent(mut self) -> Self {
        self.advertised_name = None;
        self
    }

    /// Scan start fails with the given platform message
    fn failing_scan_start(mut self, message: &str) -> Self {
        self.scan_start_error = Some(message.to_string());
        self
    }

    /// MTU granted by the peripheral
    fn granting_mtu(mut self, mtu: u16) -> Self {
        self.granted_mtu = mtu;
        self
    }

    /// Service discovery resolves to the given outcome
    fn discovering(mut self, outcome: DiscoveryOutcome) -> Self {
        self.discovery = outcome;
        self
    }

    /// Subscription fails with the given reason
    fn failing_subscribe(mut self, reason: &str) -> Self {
        self.subscribe_error = Some(reason.to_string());
        self
    }

    /// Connect is dispatched but never concludes
    fn holding_connect(mut self) -> Self {
        self.hold_connect = true;
        self
    }

    /// Discovery is dispatched but never concludes
    fn holding_discovery(mut self) -> Self {
        self.hold_discovery = true;
        self
    }

    fn record(&self, call: RadioCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn send_later(&self, event: LinkEvent) {
        let events = self.events.clone();
        tokio::spawn(async move {
            let _ = events.send(event).await;
        });
    }
}

#[async_trait]
impl Radio for ScriptRadio {
    async fn start_scan(&mut self, session: SessionId) -> Result<(), RadioError> {
        self.record(RadioCall::StartScan);
        if let Some(message) = &self.scan_start_error {
            return Err(RadioError::ScanStartFailed(message.clone()));
        }
        if let Some(name) = self.advertised_name.clone() {
            self.send_later(LinkEvent::ScanMatch { session, name });
        }
        Ok(())
    }

    async fn stop_scan(&mut self) -> Result<(), RadioError> {
        self.record(RadioCall::StopScan);
        Ok(())
    }

    async fn connect(&mut self, session: SessionId) -> Result<(), RadioError> {
        self.record(RadioCall::Connect);
        if !self.hold_connect {
            self.send_later(LinkEvent::Connected { session });
        }
        Ok(())
    }

    async fn request_mtu(&mut self, session: SessionId, target: u16) -> Result<(), RadioError> {
        self.record(RadioCall::RequestMtu(target));
        self.send_later(LinkEvent::MtuChanged {
            session,
            mtu: self.granted_mtu,
        });
        Ok(())
    }

    async fn discover_services(&mut self, session: SessionId) -> Result<(), RadioError> {
        self.record(RadioCall::DiscoverServices);
        if !self.hold_discovery {
            self.send_later(LinkEvent::ServicesDiscovered {
                session,
                outcome: self.discovery,
            });
        }
        Ok(())
    }

    async fn subscribe_notifications(&mut self, session: SessionId) -> Result<(), RadioError> {
        self.record(RadioCall::Subscribe);
        match self.subscribe_error.clone() {
            Some(reason) => self.send_later(LinkEvent::SubscriptionFailed { session, reason }),
            None => self.send_later(LinkEvent::SubscriptionDispatched { session }),
        }
        Ok(())
    }

    async fn tear_down(&mut self) {
        self.record(RadioCall::TearDown);
    }
}

// ----------------------------------------------------------------------------
// Scripted Adapter Gate
// ----------------------------------------------------------------------------

/// Adapter gate answering from fixed power and enable-flow answers
#[derive(Clone, Copy)]
struct ScriptAdapterGate {
    status: AdapterStatus,
    enable_granted: bool,
}

impl ScriptAdapterGate {
    fn powered_on() -> Self {
        Self {
            status: AdapterStatus::PoweredOn,
            enable_granted: true,
        }
    }

    fn powered_off(enable_granted: bool) -> Self {
        Self {
            status: AdapterStatus::PoweredOff,
            enable_granted,
        }
    }

    fn absent() -> Self {
        Self {
            status: AdapterStatus::Absent,
            enable_granted: false,
        }
    }
}

#[async_trait]
impl AdapterGate for ScriptAdapterGate {
    async fn status(&self) -> Result<AdapterStatus, RadioError> {
        Ok(self.status)
    }

    async fn request_enable(&self) -> Result<bool, RadioError> {
        Ok(self.enable_granted)
    }

    fn open_settings(&self) -> Result<(), RadioError> {
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

/// Identity of the nth session started on a fresh driver
fn session(n: u64) -> SessionId {
    (0..n).fold(SessionId::initial(), |id, _| id.next())
}

/// Receive the next emission, failing loudly if none arrives
async fn next_event(handle: &mut DriverHandle) -> AppEvent {
    timeout(Duration::from_secs(60), handle.app_events.recv())
        .await
        .expect("an emission should arrive before the timeout")
        .expect("the app event channel should stay open")
}

/// Every start is preceded by an unconditional teardown of the previous
/// session; these two emissions are its trace.
async fn expect_purge(handle: &mut DriverHandle) {
    assert_eq!(
        next_event(handle).await,
        AppEvent::Status(StatusReport::resources_purged())
    );
    assert_eq!(
        next_event(handle).await,
        AppEvent::Connection(ConnectionSignal::Disconnected)
    );
}

/// Drain emissions until the link reports itself live
async fn run_to_streaming(handle: &mut DriverHandle) {
    loop {
        if next_event(handle).await == AppEvent::Connection(ConnectionSignal::Connected) {
            return;
        }
    }
}

/// Let the driver settle, then assert nothing further was emitted
async fn expect_quiet(handle: &mut DriverHandle) {
    sleep(Duration::from_millis(50)).await;
    assert_eq!(handle.app_events.try_recv(), Err(TryRecvError::Empty));
}

// ----------------------------------------------------------------------------
// Lifecycle Tests
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_start_link_reaches_streaming() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx);
    let calls = radio.calls_handle();
    let mut handle = spawn_driver(
        radio,
        StaticGate::default(),
        ScriptAdapterGate::powered_on(),
        LinkConfig::default(),
        events_rx,
    );

    assert_ok!(handle.commands.send(Command::StartLink).await);

    expect_purge(&mut handle).await;
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::scan_started())
    );
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::matched("OSM-Bridge-01"))
    );
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::contacting_hardware())
    );
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::handshake_initiated())
    );
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::mtu_synced(244))
    );
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::stream_active())
    );
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Connection(ConnectionSignal::Connected)
    );

    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            RadioCall::StartScan,
            RadioCall::StopScan,
            RadioCall::Connect,
            RadioCall::RequestMtu(512),
            RadioCall::DiscoverServices,
            RadioCall::Subscribe,
        ]
    );

    // Commanded teardown releases the transport and reports the purge
    assert_ok!(handle.commands.send(Command::Disconnect).await);
    expect_purge(&mut handle).await;
    assert_eq!(*calls.lock().unwrap().last().unwrap(), RadioCall::TearDown);
    expect_quiet(&mut handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_settle_delays_gate_the_handshake() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx);
    let mut handle = spawn_driver(
        radio,
        StaticGate::default(),
        ScriptAdapterGate::powered_on(),
        LinkConfig::default(),
        events_rx,
    );

    assert_ok!(handle.commands.send(Command::StartLink).await);

    let mut handshake_at = None;
    let mut mtu_at = None;
    loop {
        let event = next_event(&mut handle).await;
        match event {
            AppEvent::Status(report) if report == StatusReport::handshake_initiated() => {
                handshake_at = Some(Instant::now());
            }
            AppEvent::Status(report) if report == StatusReport::mtu_synced(244) => {
                mtu_at = Some(Instant::now());
            }
            AppEvent::Status(report) if report == StatusReport::stream_active() => {
                break;
            }
            _ => {}
        }
    }
    let stream_at = Instant::now();
    let handshake_at = handshake_at.expect("handshake status should have been seen");
    let mtu_at = mtu_at.expect("mtu status should have been seen");

    // The MTU request waits out the full post-connect settle delay
    let mtu_wait = mtu_at.duration_since(handshake_at);
    assert!(
        mtu_wait >= Duration::from_millis(1000) && mtu_wait < Duration::from_millis(1100),
        "mtu request settled after {:?}",
        mtu_wait
    );

    // Service discovery waits out the post-MTU settle delay
    let discovery_wait = stream_at.duration_since(mtu_at);
    assert!(
        discovery_wait >= Duration::from_millis(600) && discovery_wait < Duration::from_millis(700),
        "discovery settled after {:?}",
        discovery_wait
    );
}

#[tokio::test(start_paused = true)]
async fn test_scan_window_times_out_once() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx).silent();
    let calls = radio.calls_handle();
    let mut handle = spawn_driver(
        radio,
        StaticGate::default(),
        ScriptAdapterGate::powered_on(),
        LinkConfig::default(),
        events_rx,
    );

    assert_ok!(handle.commands.send(Command::StartLink).await);
    expect_purge(&mut handle).await;
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::scan_started())
    );
    let scanning_at = Instant::now();

    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::scan_timeout(Duration::from_secs(20)))
    );
    assert!(scanning_at.elapsed() >= Duration::from_secs(20));
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Connection(ConnectionSignal::Disconnected)
    );

    // Exactly one timeout, exactly one disconnected signal, scan stopped
    expect_quiet(&mut handle).await;
    assert_eq!(
        *calls.lock().unwrap(),
        vec![RadioCall::StartScan, RadioCall::StopScan]
    );
}

#[tokio::test(start_paused = true)]
async fn test_scan_timer_lapses_quietly_after_match() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx);
    let mut handle = spawn_driver(
        radio,
        StaticGate::default(),
        ScriptAdapterGate::powered_on(),
        LinkConfig::default(),
        events_rx,
    );

    assert_ok!(handle.commands.send(Command::StartLink).await);
    run_to_streaming(&mut handle).await;

    // The 20 s scan timer fires under the live session; the phase check
    // swallows it without emitting anything.
    sleep(Duration::from_secs(25)).await;
    assert_eq!(handle.app_events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test(start_paused = true)]
async fn test_superseded_session_events_dropped() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx.clone()).silent();
    let calls = radio.calls_handle();
    let mut handle = spawn_driver(
        radio,
        StaticGate::default(),
        ScriptAdapterGate::powered_on(),
        LinkConfig::default(),
        events_rx,
    );

    // First session scans; the second supersedes it
    assert_ok!(handle.commands.send(Command::StartLink).await);
    expect_purge(&mut handle).await;
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::scan_started())
    );
    assert_ok!(handle.commands.send(Command::StartLink).await);
    expect_purge(&mut handle).await;
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::scan_started())
    );

    // A late match from the superseded session is dropped on identity;
    // the same match under the live identity goes through.
    assert_ok!(
        events_tx
            .send(LinkEvent::ScanMatch {
                session: session(1),
                name: "OSM-Bridge-01".to_string(),
            })
            .await
    );
    assert_ok!(
        events_tx
            .send(LinkEvent::ScanMatch {
                session: session(2),
                name: "ESP32-CAN".to_string(),
            })
            .await
    );

    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::matched("ESP32-CAN"))
    );
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::contacting_hardware())
    );

    // The stale match never stopped the scan or dialed a connection
    let recorded = calls.lock().unwrap().clone();
    assert_eq!(
        recorded,
        vec![
            RadioCall::StartScan,
            RadioCall::StopScan,
            RadioCall::StartScan,
            RadioCall::StopScan,
            RadioCall::Connect,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_notification_frames_relayed_sanitized() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx.clone());
    let mut handle = spawn_driver(
        radio,
        StaticGate::default(),
        ScriptAdapterGate::powered_on(),
        LinkConfig::default(),
        events_rx,
    );

    assert_ok!(handle.commands.send(Command::StartLink).await);
    run_to_streaming(&mut handle).await;

    assert_ok!(
        events_tx
            .send(LinkEvent::Notification {
                session: session(1),
                payload: b"rpm=2500\r\n".to_vec(),
            })
            .await
    );
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Data("rpm=2500\\n".to_string())
    );

    // The stream keeps relaying frame after frame
    assert_ok!(
        events_tx
            .send(LinkEvent::Notification {
                session: session(1),
                payload: b"temp=88\r\n".to_vec(),
            })
            .await
    );
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Data("temp=88\\n".to_string())
    );
}

// ----------------------------------------------------------------------------
// Failure Tests
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_scan_failure_reports_and_stops() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx.clone()).silent();
    let calls = radio.calls_handle();
    let mut handle = spawn_driver(
        radio,
        StaticGate::default(),
        ScriptAdapterGate::powered_on(),
        LinkConfig::default(),
        events_rx,
    );

    assert_ok!(handle.commands.send(Command::StartLink).await);
    expect_purge(&mut handle).await;
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::scan_started())
    );

    assert_ok!(
        events_tx
            .send(LinkEvent::ScanFailed {
                session: session(1),
                failure: ScanFailure::StackExhausted,
            })
            .await
    );

    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::scan_failed(&ScanFailure::StackExhausted))
    );
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Connection(ConnectionSignal::Error)
    );
    assert_eq!(
        *calls.lock().unwrap(),
        vec![RadioCall::StartScan, RadioCall::StopScan]
    );
}

#[tokio::test(start_paused = true)]
async fn test_scan_start_exception_leaves_no_timer() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx).failing_scan_start("hci device busy");
    let mut handle = spawn_driver(
        radio,
        StaticGate::default(),
        ScriptAdapterGate::powered_on(),
        LinkConfig::default(),
        events_rx,
    );

    assert_ok!(handle.commands.send(Command::StartLink).await);
    expect_purge(&mut handle).await;
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::scan_started())
    );

    let event = next_event(&mut handle).await;
    match event {
        AppEvent::Status(report) => {
            assert_eq!(report.kind, StatusKind::Exception);
            assert!(report.text.contains("hci device busy"));
        }
        other => panic!("expected an exception status, got {:?}", other),
    }

    // No scan window was armed after the failed start; the session sits
    // until the consumer commands it again.
    sleep(Duration::from_secs(25)).await;
    assert_eq!(handle.app_events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test(start_paused = true)]
async fn test_connect_failure_ends_like_loss() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx.clone()).holding_connect();
    let calls = radio.calls_handle();
    let mut handle = spawn_driver(
        radio,
        StaticGate::default(),
        ScriptAdapterGate::powered_on(),
        LinkConfig::default(),
        events_rx,
    );

    assert_ok!(handle.commands.send(Command::StartLink).await);
    expect_purge(&mut handle).await;
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::scan_started())
    );
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::matched("OSM-Bridge-01"))
    );
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::contacting_hardware())
    );

    assert_ok!(
        events_tx
            .send(LinkEvent::ConnectFailed {
                session: session(1),
                reason: "connection timeout".to_string(),
            })
            .await
    );

    // A failed attempt ends the session the same way a dropped link does
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::link_terminated())
    );
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Connection(ConnectionSignal::Disconnected)
    );
    assert_eq!(*calls.lock().unwrap().last().unwrap(), RadioCall::TearDown);
    expect_quiet(&mut handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_service_missing_outcome_errors() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx).discovering(DiscoveryOutcome::ServiceMissing);
    let calls = radio.calls_handle();
    let mut handle = spawn_driver(
        radio,
        StaticGate::default(),
        ScriptAdapterGate::powered_on(),
        LinkConfig::default(),
        events_rx,
    );

    assert_ok!(handle.commands.send(Command::StartLink).await);

    loop {
        let event = next_event(&mut handle).await;
        if event == AppEvent::Status(StatusReport::service_missing()) {
            break;
        }
    }
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Connection(ConnectionSignal::Error)
    );
    assert_eq!(*calls.lock().unwrap().last().unwrap(), RadioCall::TearDown);
    expect_quiet(&mut handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_subscription_failure_tears_down() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx).failing_subscribe("descriptor write rejected");
    let calls = radio.calls_handle();
    let mut handle = spawn_driver(
        radio,
        StaticGate::default(),
        ScriptAdapterGate::powered_on(),
        LinkConfig::default(),
        events_rx,
    );

    assert_ok!(handle.commands.send(Command::StartLink).await);

    loop {
        let event = next_event(&mut handle).await;
        if let AppEvent::Status(report) = &event {
            if report.kind == StatusKind::Exception {
                assert!(report.text.contains("descriptor write rejected"));
                break;
            }
        }
    }
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Connection(ConnectionSignal::Error)
    );
    assert_eq!(*calls.lock().unwrap().last().unwrap(), RadioCall::TearDown);
}

#[tokio::test(start_paused = true)]
async fn test_unsolicited_loss_mid_discovery_allows_restart() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx.clone()).holding_discovery();
    let calls = radio.calls_handle();
    let mut handle = spawn_driver(
        radio,
        StaticGate::default(),
        ScriptAdapterGate::powered_on(),
        LinkConfig::default(),
        events_rx,
    );

    assert_ok!(handle.commands.send(Command::StartLink).await);
    loop {
        let event = next_event(&mut handle).await;
        if event == AppEvent::Status(StatusReport::mtu_synced(244)) {
            break;
        }
    }

    // Discovery was dispatched and is hanging when the transport drops
    sleep(Duration::from_millis(700)).await;
    assert_ok!(
        events_tx
            .send(LinkEvent::LinkLost {
                session: session(1),
            })
            .await
    );

    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::link_terminated())
    );
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Connection(ConnectionSignal::Disconnected)
    );
    expect_quiet(&mut handle).await;

    // A fresh start scans again under a new identity
    assert_ok!(handle.commands.send(Command::StartLink).await);
    expect_purge(&mut handle).await;
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::scan_started())
    );
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::matched("OSM-Bridge-01"))
    );

    let recorded = calls.lock().unwrap().clone();
    let scans = recorded
        .iter()
        .filter(|call| **call == RadioCall::StartScan)
        .count();
    assert_eq!(scans, 2);
}

// ----------------------------------------------------------------------------
// Adapter and Authorization Tests
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_adapter_enable_flow_granted() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx);
    let mut handle = spawn_driver(
        radio,
        StaticGate::default(),
        ScriptAdapterGate::powered_off(true),
        LinkConfig::default(),
        events_rx,
    );

    assert_ok!(handle.commands.send(Command::StartLink).await);
    expect_purge(&mut handle).await;
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::bluetooth_authorized())
    );
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::scan_started())
    );
}

#[tokio::test(start_paused = true)]
async fn test_adapter_enable_flow_denied() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx);
    let calls = radio.calls_handle();
    let mut handle = spawn_driver(
        radio,
        StaticGate::default(),
        ScriptAdapterGate::powered_off(false),
        LinkConfig::default(),
        events_rx,
    );

    assert_ok!(handle.commands.send(Command::StartLink).await);
    expect_purge(&mut handle).await;
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::activation_denied())
    );
    expect_quiet(&mut handle).await;
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_adapter_absent_reports_scanner_unavailable() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx);
    let calls = radio.calls_handle();
    let mut handle = spawn_driver(
        radio,
        StaticGate::default(),
        ScriptAdapterGate::absent(),
        LinkConfig::default(),
        events_rx,
    );

    assert_ok!(handle.commands.send(Command::StartLink).await);
    expect_purge(&mut handle).await;
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::scanner_unavailable())
    );
    expect_quiet(&mut handle).await;
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_missing_scan_authorization_skips_scan() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx);
    let calls = radio.calls_handle();
    let mut handle = spawn_driver(
        radio,
        StaticGate::granting(false, true),
        ScriptAdapterGate::powered_on(),
        LinkConfig::default(),
        events_rx,
    );

    assert_ok!(handle.commands.send(Command::StartLink).await);
    expect_purge(&mut handle).await;
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::scan_started())
    );

    // The point-of-use check trips at dispatch; the scan never starts and
    // no scan window is armed.
    let event = next_event(&mut handle).await;
    match event {
        AppEvent::Status(report) => assert_eq!(report.kind, StatusKind::PermissionDenied),
        other => panic!("expected a permission status, got {:?}", other),
    }
    sleep(Duration::from_secs(25)).await;
    assert_eq!(handle.app_events.try_recv(), Err(TryRecvError::Empty));
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_missing_connect_authorization_blocks_enable_flow() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx);
    let calls = radio.calls_handle();
    let mut handle = spawn_driver(
        radio,
        StaticGate::granting(true, false),
        ScriptAdapterGate::powered_off(true),
        LinkConfig::default(),
        events_rx,
    );

    assert_ok!(handle.commands.send(Command::StartLink).await);
    expect_purge(&mut handle).await;
    let event = next_event(&mut handle).await;
    match event {
        AppEvent::Status(report) => assert_eq!(report.kind, StatusKind::PermissionDenied),
        other => panic!("expected a permission status, got {:?}", other),
    }
    expect_quiet(&mut handle).await;
    assert!(calls.lock().unwrap().is_empty());
}

// ----------------------------------------------------------------------------
// Command Surface Tests
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_disconnect_idempotent_from_idle() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx);
    let calls = radio.calls_handle();
    let mut handle = spawn_driver(
        radio,
        StaticGate::default(),
        ScriptAdapterGate::powered_on(),
        LinkConfig::default(),
        events_rx,
    );

    // Each disconnect completes as one purge report and one signal,
    // never touching the radio while nothing is held.
    for _ in 0..3 {
        assert_ok!(handle.commands.send(Command::Disconnect).await);
        expect_purge(&mut handle).await;
    }
    expect_quiet(&mut handle).await;
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_open_radio_settings_emits_manual_action() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx);
    let mut handle = spawn_driver(
        radio,
        StaticGate::default(),
        ScriptAdapterGate::powered_on(),
        LinkConfig::default(),
        events_rx,
    );

    assert_ok!(handle.commands.send(Command::OpenRadioSettings).await);
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::manual_radio_reset())
    );
    expect_quiet(&mut handle).await;
}

// ----------------------------------------------------------------------------
// Policy Override Tests
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_custom_scan_window_in_timeout_text() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx).silent();
    let config = LinkConfig::default().with_scan_timeout(Duration::from_secs(5));
    let mut handle = spawn_driver(
        radio,
        StaticGate::default(),
        ScriptAdapterGate::powered_on(),
        config,
        events_rx,
    );

    assert_ok!(handle.commands.send(Command::StartLink).await);
    expect_purge(&mut handle).await;
    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::scan_started())
    );
    let scanning_at = Instant::now();

    assert_eq!(
        next_event(&mut handle).await,
        AppEvent::Status(StatusReport::scan_timeout(Duration::from_secs(5)))
    );
    let waited = scanning_at.elapsed();
    assert!(
        waited >= Duration::from_secs(5) && waited < Duration::from_secs(6),
        "scan window elapsed after {:?}",
        waited
    );
}

#[tokio::test(start_paused = true)]
async fn test_custom_mtu_target_requested() {
    let (events_tx, events_rx) = event_channel();
    let radio = ScriptRadio::new(events_tx).granting_mtu(247);
    let calls = radio.calls_handle();
    let config = LinkConfig::default().with_target_mtu(247);
    let mut handle = spawn_driver(
        radio,
        StaticGate::default(),
        ScriptAdapterGate::powered_on(),
        config,
        events_rx,
    );

    assert_ok!(handle.commands.send(Command::StartLink).await);
    run_to_streaming(&mut handle).await;

    let recorded = calls.lock().unwrap().clone();
    assert!(recorded.contains(&RadioCall::RequestMtu(247)));
}
