//! Write a command and correlate its response by transaction id.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use super::Shared;
use super::sequence::Abort;
use crate::protocol::Message;
use crate::session::{Inbox, SessionHandle};
use crate::types::ConnectionState;
use crate::CamlinkError;

impl Shared {
    /// Write `message` and wait for a response carrying `expected_transaction_id`.
    ///
    /// Responses with other transaction ids are logged and skipped. The inner
    /// `Err` is a [`CamlinkError::ResponseTimeout`]; whether that is fatal is
    /// up to the caller. Transport failures and a stale handle abort.
    pub(crate) async fn send_and_wait_for_response(
        &self,
        handle: &SessionHandle,
        message: &Message,
        expected_transaction_id: u16,
        timeout: Duration,
    ) -> Result<Result<Message, CamlinkError>, Abort> {
        let (inbox, command_lock) = self.session_io(handle).await?;
        let _exclusive = command_lock.lock().await;
        self.ensure_current(handle).await?;

        let stale = inbox.drain();
        if stale > 0 {
            trace!("Discarded {} stale notifications for {}", stale, handle.device_id);
        }

        self.write(handle, message).await?;

        let response = tokio::time::timeout(
            timeout,
            wait_for_transaction(&inbox, handle, expected_transaction_id),
        )
        .await;
        self.ensure_current(handle).await?;

        Ok(response.map_err(|_| CamlinkError::ResponseTimeout {
            transaction_id: expected_transaction_id,
            duration: timeout,
        }))
    }

    /// Write `message` without waiting for any response.
    pub(crate) async fn send(&self, handle: &SessionHandle, message: &Message) -> Result<(), Abort> {
        let (_, command_lock) = self.session_io(handle).await?;
        let _exclusive = command_lock.lock().await;
        self.ensure_current(handle).await?;
        self.write(handle, message).await
    }

    async fn write(&self, handle: &SessionHandle, message: &Message) -> Result<(), Abort> {
        trace!(
            "Writing transaction {:#06x} to {} ({} payload bytes)",
            message.transaction_id,
            handle.device_id,
            message.payload.len()
        );
        self.transport.write_command(&handle.device_id, &message.encode()).await.map_err(|e| {
            Abort::Failed { state: ConnectionState::Error, error: e.into() }
        })
    }

    async fn session_io(
        &self,
        handle: &SessionHandle,
    ) -> Result<(Arc<Inbox>, Arc<tokio::sync::Mutex<()>>), Abort> {
        let registry = self.registry.read().await;
        match registry.get(&handle.device_id) {
            Some(session) if session.is_current(handle) => {
                Ok((Arc::clone(&session.inbox), Arc::clone(&session.command_lock)))
            }
            _ => Err(Abort::Detached),
        }
    }
}

async fn wait_for_transaction(inbox: &Inbox, handle: &SessionHandle, expected: u16) -> Message {
    loop {
        let message = inbox.recv().await;
        if message.transaction_id == expected {
            return message;
        }
        debug!(
            "{}: waiting for transaction {:#06x}, skipping {:#06x}",
            handle.device_id, expected, message.transaction_id
        );
    }
}
