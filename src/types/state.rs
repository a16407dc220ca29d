//! Session state as seen by consumers

use serde::Serialize;
use std::fmt;
use std::time::SystemTime;

use super::{DeviceInfo, StreamConfig};

/// Where a camera is in its control sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Pairing,
    Stopping,
    PreparingStream,
    SettingUpWifi,
    WifiSetupFailed,
    Configuring,
    StartingStream,
    Streaming,
    Error,
}

impl ConnectionState {
    /// States a failed sequence ends in.
    pub fn is_failure(self) -> bool {
        matches!(self, ConnectionState::Error | ConnectionState::WifiSetupFailed)
    }

    /// States in which the connect sequence still owns the device.
    pub fn is_connecting(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Pairing)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Pairing => "pairing",
            ConnectionState::Stopping => "stopping",
            ConnectionState::PreparingStream => "preparing stream",
            ConnectionState::SettingUpWifi => "setting up wifi",
            ConnectionState::WifiSetupFailed => "wifi setup failed",
            ConnectionState::Configuring => "configuring",
            ConnectionState::StartingStream => "starting stream",
            ConnectionState::Streaming => "streaming",
            ConnectionState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Point-in-time copy of a device session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct SessionSnapshot {
    pub device: DeviceInfo,
    pub connection_state: ConnectionState,
    pub last_error: Option<String>,
    #[cfg_attr(feature = "tauri", specta(skip))]
    pub last_update: SystemTime,
    /// Battery level in percent, `-1` until the camera reports it.
    pub battery_percentage: i32,
    pub stream_config: Option<StreamConfig>,
}

/// Change notification published to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum SessionUpdate {
    Changed(SessionSnapshot),
    Removed(super::DeviceId),
}

impl SessionUpdate {
    pub fn device_id(&self) -> &super::DeviceId {
        match self {
            SessionUpdate::Changed(snapshot) => &snapshot.device.id,
            SessionUpdate::Removed(id) => id,
        }
    }
}
