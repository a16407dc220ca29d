//! Test utilities: a scripted, recording transport.
//!
//! [`MockTransport`] records every frame the controller writes and answers
//! through the registered [`NotificationSink`] the way a camera would:
//! by default each command is acknowledged with a `[0x00, 0x00]` payload on
//! the same target, transaction id and message type. Individual transaction
//! ids can be scripted to stay silent, answer with a custom payload, or be
//! preceded by unrelated notifications.

#![cfg(any(test, feature = "test-utils", feature = "benchmark"))]

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use crate::TransportError;
use crate::protocol::Message;
use crate::transport::{NotificationSink, Transport};
use crate::types::{DeviceId, DeviceInfo};

/// How the mock answers one transaction id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Echo the triple with a `[0x00, 0x00]` payload.
    Ack,
    /// Echo the triple with this payload.
    Payload(Vec<u8>),
    /// Send nothing.
    Silent,
}

/// A frame the controller wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Written {
    pub device_id: DeviceId,
    pub bytes: Vec<u8>,
}

impl Written {
    /// Decode the written frame; panics on malformed output.
    pub fn message(&self) -> Message {
        Message::decode(&self.bytes).expect("controller wrote an undecodable frame")
    }
}

#[derive(Debug, Default)]
struct Script {
    replies: HashMap<u16, Reply>,
    preludes: HashMap<u16, Vec<Message>>,
    connect_failures: HashMap<DeviceId, String>,
    write_failures: HashMap<u16, String>,
    reply_delay: Duration,
    duplicate_delivery: bool,
}

/// Recording transport stub driven by a per-transaction script.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<Script>,
    writes: Mutex<Vec<Written>>,
    connects: Mutex<Vec<DeviceId>>,
    disconnects: Mutex<Vec<DeviceId>>,
    sink: OnceLock<NotificationSink>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `transaction_id` with `reply` from now on.
    pub fn reply(&self, transaction_id: u16, reply: Reply) {
        lock(&self.script).replies.insert(transaction_id, reply);
    }

    /// Deliver `messages` before the reply to `transaction_id`.
    pub fn prelude(&self, transaction_id: u16, messages: Vec<Message>) {
        lock(&self.script).preludes.insert(transaction_id, messages);
    }

    pub fn fail_connect(&self, device_id: impl Into<DeviceId>, reason: impl Into<String>) {
        lock(&self.script).connect_failures.insert(device_id.into(), reason.into());
    }

    pub fn fail_write(&self, transaction_id: u16, reason: impl Into<String>) {
        lock(&self.script).write_failures.insert(transaction_id, reason.into());
    }

    /// Delay every reply, simulating camera latency.
    pub fn reply_delay(&self, delay: Duration) {
        lock(&self.script).reply_delay = delay;
    }

    /// Deliver every notification twice, as two parallel delivery paths would.
    pub fn duplicate_delivery(&self, enabled: bool) {
        lock(&self.script).duplicate_delivery = enabled;
    }

    /// Deliver an unsolicited notification now.
    pub async fn notify(&self, device_id: &DeviceId, bytes: &[u8]) {
        if let Some(sink) = self.sink.get() {
            sink.deliver(device_id, bytes).await;
        }
    }

    pub fn writes(&self) -> Vec<Written> {
        lock(&self.writes).clone()
    }

    /// Transaction ids of every write, in order.
    pub fn written_transactions(&self) -> Vec<u16> {
        self.writes().iter().map(|w| w.message().transaction_id).collect()
    }

    pub fn writes_for(&self, device_id: &DeviceId) -> Vec<Message> {
        self.writes().iter().filter(|w| &w.device_id == device_id).map(Written::message).collect()
    }

    pub fn connects(&self) -> Vec<DeviceId> {
        lock(&self.connects).clone()
    }

    pub fn disconnects(&self) -> Vec<DeviceId> {
        lock(&self.disconnects).clone()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn connect(&self, device: &DeviceInfo) -> Result<(), TransportError> {
        lock(&self.connects).push(device.id.clone());
        match lock(&self.script).connect_failures.get(&device.id) {
            Some(reason) => Err(TransportError::connect_failed(device.id.as_str(), reason.clone())),
            None => Ok(()),
        }
    }

    async fn write_command(&self, device_id: &DeviceId, bytes: &[u8]) -> Result<(), TransportError> {
        let request = Message::decode(bytes).map_err(|e| {
            TransportError::write_failed(device_id.as_str(), format!("malformed frame: {e}"))
        })?;
        lock(&self.writes).push(Written { device_id: device_id.clone(), bytes: bytes.to_vec() });

        let (notifications, delay, duplicate) = {
            let script = lock(&self.script);
            if let Some(reason) = script.write_failures.get(&request.transaction_id) {
                return Err(TransportError::write_failed(device_id.as_str(), reason.clone()));
            }
            let mut notifications: Vec<Vec<u8>> = script
                .preludes
                .get(&request.transaction_id)
                .into_iter()
                .flatten()
                .map(Message::encode)
                .collect();
            let reply = script.replies.get(&request.transaction_id).cloned().unwrap_or(Reply::Ack);
            let payload = match reply {
                Reply::Ack => Some(vec![0x00, 0x00]),
                Reply::Payload(payload) => Some(payload),
                Reply::Silent => None,
            };
            if let Some(payload) = payload {
                let response = Message::new(
                    request.target,
                    request.transaction_id,
                    request.message_type,
                    payload,
                );
                notifications.push(response.encode());
            }
            (notifications, script.reply_delay, script.duplicate_delivery)
        };

        if notifications.is_empty() {
            return Ok(());
        }
        let Some(sink) = self.sink.get().cloned() else {
            return Ok(());
        };
        let device_id = device_id.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            for bytes in notifications {
                sink.deliver(&device_id, &bytes).await;
                if duplicate {
                    sink.deliver(&device_id, &bytes).await;
                }
            }
        });
        Ok(())
    }

    async fn disconnect(&self, device_id: &DeviceId) -> Result<(), TransportError> {
        lock(&self.disconnects).push(device_id.clone());
        Ok(())
    }

    fn register_notifications(&self, sink: NotificationSink) {
        let _ = self.sink.set(sink);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Battery telemetry notification reporting `percentage`.
pub fn battery_notification(percentage: u8) -> Message {
    let mut payload = vec![0u8; 21];
    payload[20] = percentage;
    Message::new(0x0000, 0x0000, crate::protocol::payload::BATTERY_STATUS_TYPE, payload)
}
