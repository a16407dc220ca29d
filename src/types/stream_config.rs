//! Streaming parameters negotiated with a camera

use serde::{Deserialize, Serialize};

use super::DeviceModel;
use crate::{CamlinkError, Result};

/// Output resolution requested from the camera.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum Resolution {
    #[serde(rename = "480p")]
    R480p,
    #[serde(rename = "720p")]
    R720p,
    #[default]
    #[serde(rename = "1080p")]
    R1080p,
}

/// In-camera image stabilization mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(rename_all = "kebab-case")]
pub enum Stabilization {
    #[default]
    Off,
    RockSteady,
    HorizonSteady,
    RockSteadyPlus,
    HorizonBalance,
}

/// Everything a camera needs to join a network and push an RTMP stream.
///
/// Build one with [`StreamConfig::new`] and the `with_*` methods. The
/// high-end flag is filled in by the controller from the device model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct StreamConfig {
    pub wifi_ssid: String,
    #[serde(skip_serializing, default)]
    #[cfg_attr(feature = "tauri", specta(skip))]
    pub wifi_password: String,
    pub rtmp_url: String,
    pub resolution: Resolution,
    pub fps: u32,
    pub bitrate_kbps: u16,
    pub stabilization: Stabilization,
    #[serde(default)]
    pub is_high_end_model: bool,
}

impl StreamConfig {
    pub const DEFAULT_FPS: u32 = 30;
    pub const DEFAULT_BITRATE_KBPS: u16 = 6000;

    pub fn new(
        wifi_ssid: impl Into<String>,
        wifi_password: impl Into<String>,
        rtmp_url: impl Into<String>,
    ) -> Self {
        Self {
            wifi_ssid: wifi_ssid.into(),
            wifi_password: wifi_password.into(),
            rtmp_url: rtmp_url.into(),
            resolution: Resolution::default(),
            fps: Self::DEFAULT_FPS,
            bitrate_kbps: Self::DEFAULT_BITRATE_KBPS,
            stabilization: Stabilization::default(),
            is_high_end_model: false,
        }
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_bitrate_kbps(mut self, bitrate_kbps: u16) -> Self {
        self.bitrate_kbps = bitrate_kbps;
        self
    }

    pub fn with_stabilization(mut self, stabilization: Stabilization) -> Self {
        self.stabilization = stabilization;
        self
    }

    /// Derive the protocol variant flag from the detected model.
    pub(crate) fn for_model(mut self, model: DeviceModel) -> Self {
        self.is_high_end_model = model.is_high_end();
        self
    }

    /// Reject configurations that cannot be encoded.
    ///
    /// Runs before any byte is written to the camera.
    pub fn validate(&self) -> Result<()> {
        if self.wifi_ssid.trim().is_empty() {
            return Err(CamlinkError::validation("wifi_ssid", "must not be empty"));
        }
        if self.rtmp_url.trim().is_empty() {
            return Err(CamlinkError::validation("rtmp_url", "must not be empty"));
        }
        Ok(())
    }
}
