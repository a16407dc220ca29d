//! Error types for camera control.
//!
//! Three layers of failure:
//!
//! - [`DecodeError`]: malformed notification bytes. These never escape the
//!   notification path; the bytes are logged and dropped.
//! - [`TransportError`]: the BLE collaborator failed to connect or write.
//!   A sequence that hits one aborts to `ConnectionState::Error`.
//! - [`CamlinkError`]: everything a caller of the controller can observe,
//!   either synchronously (validation, unknown device) or through
//!   `SessionSnapshot::last_error` (timeouts, WiFi rejection).
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use camlink::CamlinkError;
//!
//! let error = CamlinkError::session_not_found("cam-1");
//! if !error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::time::Duration;
use thiserror::Error;

use crate::types::ConnectionState;

/// Result type alias for camera control operations.
pub type Result<T, E = CamlinkError> = std::result::Result<T, E>;

/// Main error type for camera control operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CamlinkError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("No response for transaction {transaction_id:#06x} within {duration:?}")]
    ResponseTimeout { transaction_id: u16, duration: Duration },

    #[error("Streaming setup did not finish within {duration:?}")]
    SequenceTimeout { duration: Duration },

    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Camera rejected WiFi credentials (status {status:02x?})")]
    WifiRejected { status: Vec<u8> },

    #[error("No session for device '{device_id}'")]
    SessionNotFound { device_id: String },

    #[error("Cannot {operation} device '{device_id}' while {state}")]
    InvalidState { device_id: String, operation: &'static str, state: ConnectionState },

    #[error("Configuration error: {details}")]
    Config {
        details: String,
        #[source]
        source: Option<serde_yaml_ng::Error>,
    },
}

/// Failures reported by the BLE transport collaborator.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    #[error("Failed to connect to '{device_id}': {reason}")]
    Connect {
        device_id: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to write to '{device_id}': {reason}")]
    Write {
        device_id: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Device '{device_id}' is not connected")]
    NotConnected { device_id: String },
}

/// Reasons a notification could not be decoded into a message.
///
/// Variants are listed in the order the decoder checks them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid start byte {found:#04x}")]
    InvalidStartByte { found: u8 },

    #[error("Truncated message: header declares {declared} bytes, buffer holds {actual}")]
    Truncated { declared: usize, actual: usize },

    #[error("Invalid protocol version {found:#04x}")]
    InvalidVersion { found: u8 },

    #[error("Header CRC mismatch: expected {expected:#04x}, found {found:#04x}")]
    HeaderCrcMismatch { expected: u8, found: u8 },

    #[error("Trailer CRC mismatch: expected {expected:#06x}, found {found:#06x}")]
    TrailerCrcMismatch { expected: u16, found: u16 },
}

impl CamlinkError {
    /// Returns whether retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CamlinkError::Transport(err) => !matches!(err, TransportError::NotConnected { .. }),
            CamlinkError::Decode(_) => false,
            CamlinkError::ResponseTimeout { .. } => true,
            CamlinkError::SequenceTimeout { .. } => true,
            CamlinkError::Validation { .. } => false,
            CamlinkError::WifiRejected { .. } => false,
            CamlinkError::SessionNotFound { .. } => false,
            CamlinkError::InvalidState { .. } => true,
            CamlinkError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            CamlinkError::Transport(TransportError::NotConnected { .. }) => {
                vec!["Connect the device before issuing commands", "Check the BLE adapter is powered"]
            }
            CamlinkError::Transport(_) => vec![
                "Move the camera closer to the adapter",
                "Wake the camera and retry",
                "Power-cycle the camera if writes keep failing",
            ],
            CamlinkError::Decode(_) => vec![
                "Check the camera firmware is supported",
                "Verify notifications come from the control characteristic",
            ],
            CamlinkError::ResponseTimeout { .. } => vec![
                "Retry the operation",
                "Check the camera screen is on and not in a menu",
            ],
            CamlinkError::SequenceTimeout { .. } => vec![
                "Retry streaming setup",
                "Check the WiFi network is reachable from the camera",
                "Reconnect the device",
            ],
            CamlinkError::Validation { .. } => {
                vec!["Provide a non-empty SSID", "Provide a non-empty RTMP URL"]
            }
            CamlinkError::WifiRejected { .. } => vec![
                "Check the WiFi password",
                "Use a 2.4 GHz network the camera supports",
                "Move the camera within range of the access point",
            ],
            CamlinkError::SessionNotFound { .. } => {
                vec!["Connect the device first", "Check the device id from discovery"]
            }
            CamlinkError::InvalidState { .. } => {
                vec!["Wait for the current operation to finish", "Retry once the device is idle"]
            }
            CamlinkError::Config { .. } => {
                vec!["Check the configuration syntax", "Durations are given in milliseconds"]
            }
        }
    }

    /// Helper constructor for rejected input.
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        CamlinkError::Validation { field, reason: reason.into() }
    }

    /// Helper constructor for unknown devices.
    pub fn session_not_found(device_id: impl Into<String>) -> Self {
        CamlinkError::SessionNotFound { device_id: device_id.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(details: impl Into<String>) -> Self {
        CamlinkError::Config { details: details.into(), source: None }
    }
}

impl TransportError {
    /// Helper constructor for connection failures.
    pub fn connect_failed(device_id: impl Into<String>, reason: impl Into<String>) -> Self {
        TransportError::Connect { device_id: device_id.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for write failures.
    pub fn write_failed(device_id: impl Into<String>, reason: impl Into<String>) -> Self {
        TransportError::Write { device_id: device_id.into(), reason: reason.into(), source: None }
    }
}

impl From<serde_yaml_ng::Error> for CamlinkError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        CamlinkError::Config { details: err.to_string(), source: Some(err) }
    }
}
