//! Device identity as reported by discovery

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier assigned to a camera by the discovery collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Camera model detected from the advertisement.
///
/// Only consulted when choosing protocol variants at streaming setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum DeviceModel {
    OsmoAction2,
    OsmoAction3,
    OsmoAction4,
    OsmoAction5Pro,
    OsmoPocket3,
    Osmo360,
    Unknown,
}

impl DeviceModel {
    /// Models that use the high-end encoding variant (model byte, configure
    /// byte, and a confirm message after streaming starts).
    pub fn is_high_end(self) -> bool {
        matches!(self, DeviceModel::OsmoAction5Pro)
    }

    /// Models that need the stabilization configure step before streaming.
    pub fn requires_stabilization_setup(self) -> bool {
        matches!(self, DeviceModel::OsmoAction4 | DeviceModel::OsmoAction5Pro)
    }
}

/// Discovery record for one camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub name: String,
    pub model: DeviceModel,
}

impl DeviceInfo {
    pub fn new(id: impl Into<DeviceId>, name: impl Into<String>, model: DeviceModel) -> Self {
        Self { id: id.into(), name: name.into(), model }
    }
}
