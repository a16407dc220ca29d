//! Session manager driving cameras through their control sequences.
//!
//! The [`Controller`] owns the session registry. Public operations validate
//! their input, record the first state transition, dispatch a background
//! sequence and return; they never wait on the camera. Progress is observed
//! through [`Controller::snapshot`] or the update stream from
//! [`Controller::subscribe`].

mod exchange;
mod sequence;

use futures::Stream;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{RwLock, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::ControllerConfig;
use crate::protocol::{Message, payload};
use crate::session::{DeviceSession, PushOutcome, SessionHandle};
use crate::transport::{NotificationSink, Transport};
use crate::types::{
    ConnectionState, DeviceId, DeviceInfo, SessionSnapshot, SessionUpdate, StreamConfig,
};
use crate::{CamlinkError, Result};

use sequence::{ConfigurePlan, Detached};

/// Manages one session per connected camera.
///
/// Dropping the controller cancels every running sequence.
pub struct Controller {
    shared: Arc<Shared>,
}

/// State shared between the controller and its background sequences.
pub(crate) struct Shared {
    registry: RwLock<HashMap<DeviceId, DeviceSession>>,
    transport: Arc<dyn Transport>,
    config: ControllerConfig,
    observers: Mutex<Vec<mpsc::Sender<SessionUpdate>>>,
    epochs: AtomicU64,
    cancel: CancellationToken,
}

impl Controller {
    /// Create a controller with the default timings.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::build(transport, ControllerConfig::default())
    }

    pub fn with_config(transport: Arc<dyn Transport>, config: ControllerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(transport, config))
    }

    fn build(transport: Arc<dyn Transport>, config: ControllerConfig) -> Self {
        let shared = Arc::new(Shared {
            registry: RwLock::new(HashMap::new()),
            transport: Arc::clone(&transport),
            config,
            observers: Mutex::new(Vec::new()),
            epochs: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        });
        transport.register_notifications(NotificationSink::new(Arc::downgrade(&shared)));
        Self { shared }
    }

    /// Connect and pair a camera.
    ///
    /// Creates the session, or resets an existing one in place, then runs
    /// transport connect and a best-effort pairing exchange in the background.
    /// The session returns to `Idle` when the camera is ready.
    pub async fn connect(&self, device: DeviceInfo) -> Result<()> {
        let epoch = self.shared.next_epoch();
        let snapshot = {
            let mut registry = self.shared.registry.write().await;
            let session = registry
                .entry(device.id.clone())
                .and_modify(|session| session.reset(device.clone(), epoch))
                .or_insert_with(|| {
                    DeviceSession::new(device.clone(), epoch, self.shared.config.inbox_capacity)
                });
            session.state = ConnectionState::Connecting;
            session.touch();
            session.snapshot()
        };
        info!("Connecting to {} ({:?})", device.id, device.model);
        let handle = SessionHandle { device_id: device.id.clone(), epoch };
        self.shared.publish(SessionUpdate::Changed(snapshot));

        sequence::spawn(
            Arc::clone(&self.shared),
            handle.clone(),
            "connect",
            sequence::connect(Arc::clone(&self.shared), handle, device),
        );
        Ok(())
    }

    /// Configure WiFi and start streaming to `config.rtmp_url`.
    ///
    /// Empty SSID or RTMP URL is rejected here, before anything is written.
    pub async fn configure_streaming(&self, device_id: &DeviceId, config: StreamConfig) -> Result<()> {
        config.validate()?;

        let (handle, plan) = {
            let mut registry = self.shared.registry.write().await;
            let session = registry
                .get_mut(device_id)
                .ok_or_else(|| CamlinkError::session_not_found(device_id.as_str()))?;
            ensure_not_connecting(session, "configure streaming for")?;

            let config = config.for_model(session.device.model);
            let plan = ConfigurePlan::new(&config, session.device.model)?;

            session.epoch = self.shared.next_epoch();
            session.state = ConnectionState::Stopping;
            session.last_error = None;
            session.stream_config = None;
            session.touch();
            (session.handle(), plan)
        };
        self.shared.publish_current(device_id).await;
        info!("Configuring streaming for {}", device_id);

        sequence::spawn(
            Arc::clone(&self.shared),
            handle.clone(),
            "configure streaming",
            sequence::configure_with_deadline(Arc::clone(&self.shared), handle, plan),
        );
        Ok(())
    }

    /// Ask the camera to stop streaming and return to `Idle`.
    pub async fn stop_streaming(&self, device_id: &DeviceId) -> Result<()> {
        let handle = {
            let mut registry = self.shared.registry.write().await;
            let session = registry
                .get_mut(device_id)
                .ok_or_else(|| CamlinkError::session_not_found(device_id.as_str()))?;
            ensure_not_connecting(session, "stop streaming on")?;

            session.epoch = self.shared.next_epoch();
            session.state = ConnectionState::Stopping;
            session.touch();
            session.handle()
        };
        self.shared.publish_current(device_id).await;
        info!("Stopping stream on {}", device_id);

        sequence::spawn(
            Arc::clone(&self.shared),
            handle.clone(),
            "stop streaming",
            sequence::stop(Arc::clone(&self.shared), handle),
        );
        Ok(())
    }

    /// Remove the session and ask the transport to disconnect.
    ///
    /// The session is gone even if the transport reports an error.
    pub async fn disconnect(&self, device_id: &DeviceId) -> Result<()> {
        self.remove(device_id).await?;
        if let Err(e) = self.shared.transport.disconnect(device_id).await {
            warn!("Transport disconnect for {} failed: {}", device_id, e);
        }
        Ok(())
    }

    /// Remove the session without talking to the transport.
    ///
    /// A sequence still running for the device exits at its next check.
    pub async fn remove(&self, device_id: &DeviceId) -> Result<()> {
        let removed = self.shared.registry.write().await.remove(device_id);
        if removed.is_none() {
            return Err(CamlinkError::session_not_found(device_id.as_str()));
        }
        info!("Removed session for {}", device_id);
        self.shared.publish(SessionUpdate::Removed(device_id.clone()));
        Ok(())
    }

    pub async fn snapshot(&self, device_id: &DeviceId) -> Option<SessionSnapshot> {
        self.shared.registry.read().await.get(device_id).map(DeviceSession::snapshot)
    }

    /// Snapshots of every managed device, ordered by id.
    pub async fn snapshots(&self) -> Vec<SessionSnapshot> {
        let mut snapshots: Vec<_> =
            self.shared.registry.read().await.values().map(DeviceSession::snapshot).collect();
        snapshots.sort_by(|a, b| a.device.id.cmp(&b.device.id));
        snapshots
    }

    /// Stream of session changes.
    ///
    /// Delivery is best-effort: when an observer falls `update_buffer`
    /// updates behind, newer updates are dropped for it until it catches up.
    pub fn subscribe(&self) -> impl Stream<Item = SessionUpdate> + Send + 'static {
        let (tx, rx) = mpsc::channel(self.shared.config.update_buffer);
        self.shared.lock_observers().push(tx);
        ReceiverStream::new(rx)
    }

    /// Sink for transports that deliver notifications outside
    /// [`Transport::register_notifications`].
    pub fn notification_sink(&self) -> NotificationSink {
        NotificationSink::new(Arc::downgrade(&self.shared))
    }

    /// Feed raw notification bytes for a device.
    pub async fn handle_notification(&self, device_id: &DeviceId, bytes: &[u8]) {
        self.shared.handle_notification(device_id, bytes).await;
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.shared.config
    }

    /// Cancel every running sequence. Sessions stay in the registry.
    pub fn shutdown(&self) {
        debug!("Shutting down controller");
        self.shared.cancel.cancel();
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        debug!("Dropping controller");
        self.shared.cancel.cancel();
    }
}

fn ensure_not_connecting(session: &DeviceSession, operation: &'static str) -> Result<()> {
    if session.state.is_connecting() {
        return Err(CamlinkError::InvalidState {
            device_id: session.device.id.to_string(),
            operation,
            state: session.state,
        });
    }
    Ok(())
}

impl Shared {
    fn next_epoch(&self) -> u64 {
        self.epochs.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Apply `f` to the session if `handle` is still current, then publish.
    pub(crate) async fn update<F>(&self, handle: &SessionHandle, f: F) -> Result<(), Detached>
    where
        F: FnOnce(&mut DeviceSession),
    {
        let snapshot = {
            let mut registry = self.registry.write().await;
            let session = registry
                .get_mut(&handle.device_id)
                .filter(|session| session.is_current(handle))
                .ok_or(Detached)?;
            f(session);
            session.touch();
            session.snapshot()
        };
        self.publish(SessionUpdate::Changed(snapshot));
        Ok(())
    }

    pub(crate) async fn set_state(
        &self,
        handle: &SessionHandle,
        state: ConnectionState,
    ) -> Result<(), Detached> {
        self.update(handle, |session| {
            debug!("{}: {} -> {}", session.device.id, session.state, state);
            session.state = state;
        })
        .await
    }

    /// Fail with [`Detached`] once the handle no longer names a live session.
    pub(crate) async fn ensure_current(&self, handle: &SessionHandle) -> Result<(), Detached> {
        let registry = self.registry.read().await;
        match registry.get(&handle.device_id) {
            Some(session) if session.is_current(handle) => Ok(()),
            _ => Err(Detached),
        }
    }

    /// Decode a notification, record battery telemetry, and queue it for
    /// whichever exchange is waiting.
    pub(crate) async fn handle_notification(&self, device_id: &DeviceId, bytes: &[u8]) {
        let message = match Message::decode(bytes) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping undecodable notification from {} ({} bytes): {}", device_id, bytes.len(), e);
                return;
            }
        };
        trace!(
            "Notification from {}: transaction {:#06x}, type {:#08x}, {} payload bytes",
            device_id,
            message.transaction_id,
            message.message_type,
            message.payload.len()
        );

        let battery = payload::battery_percentage(&message);
        if battery != payload::BATTERY_UNKNOWN {
            self.record_battery(device_id, battery).await;
        }

        let inbox = {
            let registry = self.registry.read().await;
            match registry.get(device_id) {
                Some(session) => Arc::clone(&session.inbox),
                None => {
                    debug!("Notification for unmanaged device {}", device_id);
                    return;
                }
            }
        };
        match inbox.push(message) {
            PushOutcome::Queued => {}
            PushOutcome::Duplicate => trace!("Collapsed redundant notification from {}", device_id),
            PushOutcome::Displaced(old) => debug!(
                "Inbox for {} full, dropped transaction {:#06x}",
                device_id, old.transaction_id
            ),
        }
    }

    async fn record_battery(&self, device_id: &DeviceId, percentage: i32) {
        let snapshot = {
            let mut registry = self.registry.write().await;
            let Some(session) = registry.get_mut(device_id) else {
                return;
            };
            if session.battery_percentage == percentage {
                return;
            }
            debug!("{} battery at {}%", device_id, percentage);
            session.battery_percentage = percentage;
            session.touch();
            session.snapshot()
        };
        self.publish(SessionUpdate::Changed(snapshot));
    }

    async fn publish_current(&self, device_id: &DeviceId) {
        let snapshot = self.registry.read().await.get(device_id).map(DeviceSession::snapshot);
        if let Some(snapshot) = snapshot {
            self.publish(SessionUpdate::Changed(snapshot));
        }
    }

    /// Offer an update to every observer without waiting.
    fn publish(&self, update: SessionUpdate) {
        self.lock_observers().retain(|tx| match tx.try_send(update.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                trace!("Observer lagging, dropped update for {}", update.device_id());
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    fn lock_observers(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::Sender<SessionUpdate>>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
