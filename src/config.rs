//! Controller configuration.
//!
//! The defaults are the timings measured against real cameras and are what
//! [`Controller::new`](crate::Controller::new) uses. They are not tuning
//! knobs: outside tests and simulated transports every value should stay at
//! its default, since the cameras' acknowledgement latency is what they
//! encode. Overrides exist so tests can shorten waits, and can be loaded from
//! YAML with durations in milliseconds:
//!
//! ```rust
//! use camlink::ControllerConfig;
//!
//! let config = ControllerConfig::from_yaml_str("timeouts:\n  response_ms: 3000\n").unwrap();
//! assert_eq!(config.timeouts.response.as_millis(), 3000);
//! assert_eq!(config.timeouts.sequence.as_secs(), 60);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{CamlinkError, Result};

/// Bounds on every wait the controller performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Per-step wait for a correlated response.
    #[serde(rename = "response_ms", with = "millis")]
    pub response: Duration,
    /// Wait for the cleanup stop that opens streaming setup.
    #[serde(rename = "cleanup_stop_ms", with = "millis")]
    pub cleanup_stop: Duration,
    /// Wait for an explicit stop request.
    #[serde(rename = "stop_streaming_ms", with = "millis")]
    pub stop_streaming: Duration,
    /// Deadline for the whole streaming setup.
    #[serde(rename = "sequence_ms", with = "millis")]
    pub sequence: Duration,
    /// Pause between transport connect and pairing.
    #[serde(rename = "connect_settle_ms", with = "millis")]
    pub connect_settle: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            response: Duration::from_secs(5),
            cleanup_stop: Duration::from_secs(2),
            stop_streaming: Duration::from_secs(10),
            sequence: Duration::from_secs(60),
            connect_settle: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub timeouts: Timeouts,
    /// Decoded responses kept per session; the oldest is dropped when full.
    pub inbox_capacity: usize,
    /// Pending updates per observer before new ones are dropped.
    pub update_buffer: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self { timeouts: Timeouts::default(), inbox_capacity: 8, update_buffer: 64 }
    }
}

impl ControllerConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.inbox_capacity == 0 {
            return Err(CamlinkError::config("inbox_capacity must be at least 1"));
        }
        if self.update_buffer == 0 {
            return Err(CamlinkError::config("update_buffer must be at least 1"));
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
