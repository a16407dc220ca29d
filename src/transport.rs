//! Contract with the BLE transport collaborator.
//!
//! The transport owns scanning, GATT connection and characteristic discovery.
//! The controller only needs to write frames to the control characteristic
//! and to be handed the bytes of every notification.

use std::sync::Weak;
use tracing::trace;

use crate::controller::Shared;
use crate::types::{DeviceId, DeviceInfo};
use crate::TransportError;

/// Link to the cameras' control characteristics.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Establish the GATT connection and subscribe to notifications.
    async fn connect(&self, device: &DeviceInfo) -> Result<(), TransportError>;

    /// Write one encoded frame. No response correlation happens here.
    async fn write_command(&self, device_id: &DeviceId, bytes: &[u8]) -> Result<(), TransportError>;

    /// Tear down the connection.
    async fn disconnect(&self, device_id: &DeviceId) -> Result<(), TransportError>;

    /// Called once by the controller with the sink notifications go to.
    ///
    /// The sink may be cloned and called from several delivery paths at
    /// once, including redundantly for the same notification.
    fn register_notifications(&self, sink: NotificationSink);
}

/// Handle the transport uses to hand notification bytes to the controller.
///
/// Holds the controller weakly; deliveries after it is dropped are ignored.
#[derive(Clone)]
pub struct NotificationSink {
    shared: Weak<Shared>,
}

impl NotificationSink {
    pub(crate) fn new(shared: Weak<Shared>) -> Self {
        Self { shared }
    }

    pub async fn deliver(&self, device_id: &DeviceId, bytes: &[u8]) {
        match self.shared.upgrade() {
            Some(shared) => shared.handle_notification(device_id, bytes).await,
            None => trace!("Dropping notification for {}: controller gone", device_id),
        }
    }
}

impl std::fmt::Debug for NotificationSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSink").field("attached", &(self.shared.strong_count() > 0)).finish()
    }
}
