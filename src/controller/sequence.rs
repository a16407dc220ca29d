//! Background sequences for connect, streaming setup and stop.
//!
//! Every step re-validates the session handle after it suspends. Only two
//! outcomes are terminal besides transport failure: an explicit WiFi
//! rejection and the overall streaming-setup deadline. Missing or unexpected
//! acknowledgements are logged and the sequence carries on, since cameras
//! routinely omit them.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::Shared;
use crate::protocol::{Command, Message, Operation, payload};
use crate::session::SessionHandle;
use crate::types::{ConnectionState, DeviceInfo, DeviceModel, StreamConfig};
use crate::{CamlinkError, Result};

/// The session was removed, reset, or handed to a newer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Detached;

/// Why a sequence stopped early.
#[derive(Debug)]
pub(crate) enum Abort {
    Detached,
    Failed { state: ConnectionState, error: CamlinkError },
}

impl From<Detached> for Abort {
    fn from(_: Detached) -> Self {
        Abort::Detached
    }
}

/// Messages for streaming setup, built and validated before dispatch.
#[derive(Debug, Clone)]
pub(crate) struct ConfigurePlan {
    config: StreamConfig,
    stop: Message,
    prepare: Message,
    wifi: Message,
    configure: Option<Message>,
    start: Message,
    confirm: Option<Message>,
}

impl ConfigurePlan {
    pub fn new(config: &StreamConfig, model: DeviceModel) -> Result<Self> {
        let configure = model
            .requires_stabilization_setup()
            .then(|| {
                Command::Configure {
                    stabilization: config.stabilization,
                    high_end: config.is_high_end_model,
                }
                .to_message()
            })
            .transpose()?;
        let confirm =
            config.is_high_end_model.then(|| Command::ConfirmStart.to_message()).transpose()?;

        Ok(Self {
            config: config.clone(),
            stop: Command::StopStreaming.to_message()?,
            prepare: Command::PreparingToLivestream.to_message()?,
            wifi: Command::SetupWifi { ssid: &config.wifi_ssid, password: &config.wifi_password }
                .to_message()?,
            configure,
            start: Command::StartStreaming(config).to_message()?,
            confirm,
        })
    }
}

/// Run `sequence` as an independent task, recording a failure on the
/// session it was started for.
pub(crate) fn spawn<F>(shared: Arc<Shared>, handle: SessionHandle, name: &'static str, sequence: F)
where
    F: Future<Output = Result<(), Abort>> + Send + 'static,
{
    let cancel = shared.cancel.clone();
    tokio::spawn(async move {
        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("{} for {} cancelled", name, handle.device_id);
                return;
            }
            outcome = sequence => outcome,
        };

        match outcome {
            Ok(()) => debug!("{} for {} finished", name, handle.device_id),
            Err(Abort::Detached) => {
                debug!("{} for {} abandoned: session no longer current", name, handle.device_id);
            }
            Err(Abort::Failed { state, error }) => {
                error!("{} for {} failed: {}", name, handle.device_id, error);
                let message = error.to_string();
                let recorded = shared
                    .update(&handle, |session| {
                        session.state = state;
                        session.last_error = Some(message);
                    })
                    .await;
                if recorded.is_err() {
                    debug!("{} for {}: session gone before failure was recorded", name, handle.device_id);
                }
            }
        }
    });
}

pub(crate) async fn connect(
    shared: Arc<Shared>,
    handle: SessionHandle,
    device: DeviceInfo,
) -> Result<(), Abort> {
    shared
        .transport
        .connect(&device)
        .await
        .map_err(|e| Abort::Failed { state: ConnectionState::Error, error: e.into() })?;
    shared.ensure_current(&handle).await?;

    // Cameras ignore writes issued right after the GATT connection comes up.
    tokio::time::sleep(shared.config.timeouts.connect_settle).await;
    shared.ensure_current(&handle).await?;

    shared.set_state(&handle, ConnectionState::Pairing).await?;
    let pair = Command::Pair.to_message().map_err(|error| Abort::Failed {
        state: ConnectionState::Error,
        error,
    })?;
    match shared
        .send_and_wait_for_response(
            &handle,
            &pair,
            Operation::Pair.transaction_id(),
            shared.config.timeouts.response,
        )
        .await?
    {
        Ok(response) if payload::is_already_paired(&response.payload) => {
            info!("{} was already paired", handle.device_id);
        }
        Ok(_) => info!("{} paired", handle.device_id),
        Err(e) => warn!("{}: pairing not acknowledged ({}), continuing", handle.device_id, e),
    }

    shared.set_state(&handle, ConnectionState::Idle).await?;
    info!("{} ready", handle.device_id);
    Ok(())
}

/// Streaming setup bounded by the sequence deadline.
pub(crate) async fn configure_with_deadline(
    shared: Arc<Shared>,
    handle: SessionHandle,
    plan: ConfigurePlan,
) -> Result<(), Abort> {
    let deadline = shared.config.timeouts.sequence;
    match tokio::time::timeout(deadline, configure(&shared, &handle, plan)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(Abort::Failed {
            state: ConnectionState::Error,
            error: CamlinkError::SequenceTimeout { duration: deadline },
        }),
    }
}

async fn configure(shared: &Shared, handle: &SessionHandle, plan: ConfigurePlan) -> Result<(), Abort> {
    let timeouts = shared.config.timeouts;

    // Stopping was recorded at dispatch.
    soft_step(shared, handle, &plan.stop, Operation::StopStreaming, timeouts.cleanup_stop).await?;

    shared.set_state(handle, ConnectionState::PreparingStream).await?;
    soft_step(shared, handle, &plan.prepare, Operation::PreparingToLivestream, timeouts.response)
        .await?;

    shared.set_state(handle, ConnectionState::SettingUpWifi).await?;
    match shared
        .send_and_wait_for_response(
            handle,
            &plan.wifi,
            Operation::SetupWifi.transaction_id(),
            timeouts.response,
        )
        .await?
    {
        Ok(response) if payload::is_wifi_setup_success(&response.payload) => {
            info!("{} joined WiFi '{}'", handle.device_id, plan.config.wifi_ssid);
        }
        Ok(response) => {
            return Err(Abort::Failed {
                state: ConnectionState::WifiSetupFailed,
                error: CamlinkError::WifiRejected { status: response.payload },
            });
        }
        Err(e) => warn!("{}: WiFi setup not acknowledged ({}), continuing", handle.device_id, e),
    }

    if let Some(configure) = &plan.configure {
        shared.set_state(handle, ConnectionState::Configuring).await?;
        soft_step(shared, handle, configure, Operation::Configure, timeouts.response).await?;
    }

    shared.set_state(handle, ConnectionState::StartingStream).await?;
    soft_step(shared, handle, &plan.start, Operation::StartStreaming, timeouts.response).await?;

    let config = plan.config.clone();
    shared
        .update(handle, |session| {
            session.state = ConnectionState::Streaming;
            session.stream_config = Some(config);
        })
        .await?;
    info!("{} streaming to {}", handle.device_id, plan.config.rtmp_url);

    if let Some(confirm) = &plan.confirm {
        match shared.send(handle, confirm).await {
            Ok(()) => debug!("{}: sent start confirmation", handle.device_id),
            Err(Abort::Failed { error, .. }) => {
                warn!("{}: start confirmation not sent: {}", handle.device_id, error);
            }
            Err(Abort::Detached) => return Err(Abort::Detached),
        }
    }
    Ok(())
}

/// Stop an active stream and return to idle.
pub(crate) async fn stop(shared: Arc<Shared>, handle: SessionHandle) -> Result<(), Abort> {
    let stop = Command::StopStreaming.to_message().map_err(|error| Abort::Failed {
        state: ConnectionState::Error,
        error,
    })?;
    soft_step(
        &shared,
        &handle,
        &stop,
        Operation::StopStreaming,
        shared.config.timeouts.stop_streaming,
    )
    .await?;

    shared
        .update(&handle, |session| {
            session.state = ConnectionState::Idle;
            session.stream_config = None;
        })
        .await?;
    info!("{} stopped", handle.device_id);
    Ok(())
}

/// An exchange whose missing acknowledgement is only worth a warning.
async fn soft_step(
    shared: &Shared,
    handle: &SessionHandle,
    message: &Message,
    operation: Operation,
    timeout: std::time::Duration,
) -> Result<(), Abort> {
    match shared
        .send_and_wait_for_response(handle, message, operation.transaction_id(), timeout)
        .await?
    {
        Ok(_) => debug!("{}: {:?} acknowledged", handle.device_id, operation),
        Err(e) => warn!("{}: {:?} not acknowledged ({}), continuing", handle.device_id, operation, e),
    }
    Ok(())
}
