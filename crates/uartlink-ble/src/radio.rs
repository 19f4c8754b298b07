//! Radio backend for the link driver
//!
//! [`Radio`] is the seam between the state machine's effects and the
//! platform BLE stack; [`BtleRadio`] implements it with btleplug central
//! mode. Operations dispatch work and return; outcomes travel back as
//! [`LinkEvent`]s stamped with the session identity that requested them.
//! Events are sent from spawned tasks, never inline, because the task
//! consuming the event channel is the same one calling these methods.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::StreamExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uartlink_core::{DiscoveryOutcome, LinkConfig, LinkEvent, NameFilter, SessionId};

use crate::error::RadioError;
use crate::protocol::{EFFECTIVE_ATT_PAYLOAD, UART_SERVICE_UUID, UART_TX_CHARACTERISTIC_UUID};

// ----------------------------------------------------------------------------
// Radio Trait
// ----------------------------------------------------------------------------

/// Dispatch surface for the privileged radio operations the driver executes
#[async_trait]
pub trait Radio: Send + 'static {
    /// Begin a discovery pass; the first filter match is reported once
    async fn start_scan(&mut self, session: SessionId) -> Result<(), RadioError>;

    /// Abort any scan in flight; safe no-op while idle
    async fn stop_scan(&mut self) -> Result<(), RadioError>;

    /// Open a connection to the matched device
    async fn connect(&mut self, session: SessionId) -> Result<(), RadioError>;

    /// Request an MTU size increase toward `target`
    async fn request_mtu(&mut self, session: SessionId, target: u16) -> Result<(), RadioError>;

    /// Run service discovery and resolve the data characteristic
    async fn discover_services(&mut self, session: SessionId) -> Result<(), RadioError>;

    /// Enable notifications, writing the client-configuration descriptor
    async fn subscribe_notifications(&mut self, session: SessionId) -> Result<(), RadioError>;

    /// Release the transport handle, subscription, and any running tasks
    async fn tear_down(&mut self);
}

// ----------------------------------------------------------------------------
// btleplug Implementation
// ----------------------------------------------------------------------------

/// Central-mode radio backed by btleplug
pub struct BtleRadio {
    adapter: Adapter,
    filter: NameFilter,
    connection_timeout: Duration,
    events: mpsc::Sender<LinkEvent>,
    matched: Arc<Mutex<Option<Peripheral>>>,
    notify_characteristic: Arc<Mutex<Option<Characteristic>>>,
    scan_task: Option<JoinHandle<()>>,
    link_tasks: Vec<JoinHandle<()>>,
}

impl BtleRadio {
    /// Create a radio on the given adapter, reporting into `events`
    pub fn new(adapter: Adapter, config: &LinkConfig, events: mpsc::Sender<LinkEvent>) -> Self {
        Self {
            adapter,
            filter: config.filter(),
            connection_timeout: config.connection_timeout,
            events,
            matched: Arc::new(Mutex::new(None)),
            notify_characteristic: Arc::new(Mutex::new(None)),
            scan_task: None,
            link_tasks: Vec::new(),
        }
    }
}

#[async_trait]
impl Radio for BtleRadio {
    async fn start_scan(&mut self, session: SessionId) -> Result<(), RadioError> {
        *self.matched.lock().await = None;
        *self.notify_characteristic.lock().await = None;

        let mut adapter_events = self
            .adapter
            .events()
            .await
            .map_err(|e| RadioError::EventStreamFailed(e.to_string()))?;

        // All advertisement types are scanned; matching happens on the
        // advertised name, not on a service filter.
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| RadioError::ScanStartFailed(e.to_string()))?;
        debug!("Started BLE scan for session {}", session);

        let adapter = self.adapter.clone();
        let filter = self.filter.clone();
        let matched = Arc::clone(&self.matched);
        let link_events = self.events.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = adapter_events.next().await {
                // A device's name often arrives in a later advertisement
                // than its discovery.
                let id = match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                    _ => continue,
                };
                if let Ok(peripheral) = adapter.peripheral(&id).await {
                    if let Ok(Some(properties)) = peripheral.properties().await {
                        if let Some(name) = properties.local_name {
                            if filter.matches(&name) {
                                debug!("Advertisement matched: {}", name);
                                *matched.lock().await = Some(peripheral);
                                let _ = link_events
                                    .send(LinkEvent::ScanMatch { session, name })
                                    .await;
                                // First match ends the pass
                                break;
                            }
                        }
                    }
                }
            }
        });
        self.scan_task = Some(task);
        Ok(())
    }

    async fn stop_scan(&mut self) -> Result<(), RadioError> {
        if let Some(task) = self.scan_task.take() {
            task.abort();
        }
        self.adapter
            .stop_scan()
            .await
            .map_err(|e| RadioError::ScanStopFailed(e.to_string()))?;
        Ok(())
    }

    async fn connect(&mut self, session: SessionId) -> Result<(), RadioError> {
        let peripheral = self
            .matched
            .lock()
            .await
            .clone()
            .ok_or(RadioError::NoMatchedPeripheral)?;

        // The disconnect watcher needs its stream up before the link is,
        // so an immediate drop is not missed.
        let mut adapter_events = self
            .adapter
            .events()
            .await
            .map_err(|e| RadioError::EventStreamFailed(e.to_string()))?;

        let link_events = self.events.clone();
        let connection_timeout = self.connection_timeout;
        let task = tokio::spawn(async move {
            match timeout(connection_timeout, peripheral.connect()).await {
                Ok(Ok(())) => {
                    info!("Connected to {:?}", peripheral.id());
                }
                Ok(Err(e)) => {
                    let _ = link_events
                        .send(LinkEvent::ConnectFailed {
                            session,
                            reason: e.to_string(),
                        })
                        .await;
                    return;
                }
                Err(_) => {
                    let _ = link_events
                        .send(LinkEvent::ConnectFailed {
                            session,
                            reason: "connection timeout".to_string(),
                        })
                        .await;
                    return;
                }
            }

            if link_events
                .send(LinkEvent::Connected { session })
                .await
                .is_err()
            {
                return;
            }

            // Watch for unsolicited loss for as long as the link lives
            let target = peripheral.id();
            while let Some(event) = adapter_events.next().await {
                if let CentralEvent::DeviceDisconnected(id) = event {
                    if id == target {
                        debug!("Transport disconnected: {:?}", target);
                        let _ = link_events.send(LinkEvent::LinkLost { session }).await;
                        break;
                    }
                }
            }
        });
        self.link_tasks.push(task);
        Ok(())
    }

    async fn request_mtu(&mut self, session: SessionId, target: u16) -> Result<(), RadioError> {
        // btleplug settles the ATT payload during connection setup; there
        // is no separate client exchange to issue here. The granted value
        // reported is the platform's effective payload.
        let link_events = self.events.clone();
        let task = tokio::spawn(async move {
            debug!(
                "MTU target {} requested; platform grants {}",
                target, EFFECTIVE_ATT_PAYLOAD
            );
            let _ = link_events
                .send(LinkEvent::MtuChanged {
                    session,
                    mtu: EFFECTIVE_ATT_PAYLOAD,
                })
                .await;
        });
        self.link_tasks.push(task);
        Ok(())
    }

    async fn discover_services(&mut self, session: SessionId) -> Result<(), RadioError> {
        let peripheral = self
            .matched
            .lock()
            .await
            .clone()
            .ok_or(RadioError::NoMatchedPeripheral)?;

        let notify_characteristic = Arc::clone(&self.notify_characteristic);
        let link_events = self.events.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = peripheral.discover_services().await {
                warn!("Service discovery failed: {}", e);
                return;
            }

            let services = peripheral.services();
            let outcome = match services.iter().find(|s| s.uuid == UART_SERVICE_UUID) {
                None => DiscoveryOutcome::ServiceMissing,
                Some(service) => {
                    match service
                        .characteristics
                        .iter()
                        .find(|c| c.uuid == UART_TX_CHARACTERISTIC_UUID)
                    {
                        None => DiscoveryOutcome::CharacteristicMissing,
                        Some(characteristic) => {
                            *notify_characteristic.lock().await = Some(characteristic.clone());
                            DiscoveryOutcome::Resolved
                        }
                    }
                }
            };
            debug!("Service discovery outcome: {:?}", outcome);
            let _ = link_events
                .send(LinkEvent::ServicesDiscovered { session, outcome })
                .await;
        });
        self.link_tasks.push(task);
        Ok(())
    }

    async fn subscribe_notifications(&mut self, session: SessionId) -> Result<(), RadioError> {
        let peripheral = self
            .matched
            .lock()
            .await
            .clone()
            .ok_or(RadioError::NoMatchedPeripheral)?;
        let characteristic = self
            .notify_characteristic
            .lock()
            .await
            .clone()
            .ok_or(RadioError::CharacteristicNotFound {
                characteristic: UART_TX_CHARACTERISTIC_UUID,
            })?;

        let link_events = self.events.clone();
        let task = tokio::spawn(async move {
            let mut notifications = match peripheral.notifications().await {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = link_events
                        .send(LinkEvent::SubscriptionFailed {
                            session,
                            reason: e.to_string(),
                        })
                        .await;
                    return;
                }
            };

            // subscribe() writes the client-configuration descriptor; its
            // dispatch is what flips the session live.
            if let Err(e) = peripheral.subscribe(&characteristic).await {
                let _ = link_events
                    .send(LinkEvent::SubscriptionFailed {
                        session,
                        reason: e.to_string(),
                    })
                    .await;
                return;
            }
            if link_events
                .send(LinkEvent::SubscriptionDispatched { session })
                .await
                .is_err()
            {
                return;
            }

            while let Some(data) = notifications.next().await {
                if data.uuid == UART_TX_CHARACTERISTIC_UUID {
                    debug!("Notification frame: {}", hex::encode(&data.value));
                    if link_events
                        .send(LinkEvent::Notification {
                            session,
                            payload: data.value,
                        })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
            debug!("Notification stream ended");
            let _ = link_events.send(LinkEvent::LinkLost { session }).await;
        });
        self.link_tasks.push(task);
        Ok(())
    }

    async fn tear_down(&mut self) {
        if let Some(task) = self.scan_task.take() {
            task.abort();
        }
        for task in self.link_tasks.drain(..) {
            task.abort();
        }

        *self.notify_characteristic.lock().await = None;
        let peripheral = self.matched.lock().await.take();
        if let Some(peripheral) = peripheral {
            if let Err(e) = peripheral.disconnect().await {
                debug!("Disconnect during teardown failed: {}", e);
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Adapter Acquisition
// ----------------------------------------------------------------------------

/// Acquire the first available BLE adapter
pub async fn initialize_adapter() -> Result<Adapter, RadioError> {
    let manager = Manager::new()
        .await
        .map_err(|e| RadioError::ManagerUnavailable(e.to_string()))?;

    let adapters = manager
        .adapters()
        .await
        .map_err(|e| RadioError::ManagerUnavailable(e.to_string()))?;

    let adapter = adapters
        .into_iter()
        .next()
        .ok_or(RadioError::AdapterNotAvailable)?;

    info!("BLE adapter initialized");
    Ok(adapter)
}
