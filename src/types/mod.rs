//! Value types shared by the codec, the controller and consumers.
//!
//! - [`DeviceInfo`] / [`DeviceModel`] come from discovery and select protocol variants
//! - [`StreamConfig`] carries WiFi credentials and RTMP parameters
//! - [`ConnectionState`], [`SessionSnapshot`] and [`SessionUpdate`] are what
//!   observers of the controller see

mod device;
mod state;
mod stream_config;

pub use device::{DeviceId, DeviceInfo, DeviceModel};
pub use state::{ConnectionState, SessionSnapshot, SessionUpdate};
pub use stream_config::{Resolution, Stabilization, StreamConfig};
