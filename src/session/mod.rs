//! Per-device session records held in the controller's registry.

mod inbox;

use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::Mutex;

pub use inbox::{Inbox, PushOutcome};

use crate::protocol::payload::BATTERY_UNKNOWN;
use crate::types::{ConnectionState, DeviceId, DeviceInfo, SessionSnapshot, StreamConfig};

/// Identifies the operation a background sequence runs on behalf of.
///
/// The epoch advances whenever an operation is dispatched for the device or
/// the session is reset. A sequence whose handle no longer matches the
/// registry must stop without touching the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub device_id: DeviceId,
    pub epoch: u64,
}

/// Mutable record for one managed camera.
#[derive(Debug)]
pub(crate) struct DeviceSession {
    pub device: DeviceInfo,
    pub state: ConnectionState,
    pub last_error: Option<String>,
    pub last_update: SystemTime,
    pub battery_percentage: i32,
    pub stream_config: Option<StreamConfig>,
    pub epoch: u64,
    pub inbox: Arc<Inbox>,
    /// Held across each write-and-wait exchange so commands sharing a
    /// transaction id are never in flight together.
    pub command_lock: Arc<Mutex<()>>,
}

impl DeviceSession {
    pub fn new(device: DeviceInfo, epoch: u64, inbox_capacity: usize) -> Self {
        Self {
            device,
            state: ConnectionState::Idle,
            last_error: None,
            last_update: SystemTime::now(),
            battery_percentage: BATTERY_UNKNOWN,
            stream_config: None,
            epoch,
            inbox: Arc::new(Inbox::new(inbox_capacity)),
            command_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Return to a fresh state for a reconnect, keeping the record in place.
    pub fn reset(&mut self, device: DeviceInfo, epoch: u64) {
        self.device = device;
        self.state = ConnectionState::Idle;
        self.last_error = None;
        self.battery_percentage = BATTERY_UNKNOWN;
        self.stream_config = None;
        self.epoch = epoch;
        self.inbox.drain();
        self.touch();
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle { device_id: self.device.id.clone(), epoch: self.epoch }
    }

    pub fn is_current(&self, handle: &SessionHandle) -> bool {
        self.epoch == handle.epoch
    }

    pub fn touch(&mut self) {
        self.last_update = SystemTime::now();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            device: self.device.clone(),
            connection_state: self.state,
            last_error: self.last_error.clone(),
            last_update: self.last_update,
            battery_percentage: self.battery_percentage,
            stream_config: self.stream_config.clone(),
        }
    }
}
