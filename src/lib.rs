//! Protocol codec and session control for streaming action cameras over BLE.
//!
//! Camlink speaks the framed binary protocol these cameras expose on their
//! control characteristic and drives each camera through connect, pairing,
//! WiFi setup and RTMP livestream start, one independent session per device.
//!
//! # Features
//!
//! - **Codec**: byte-exact `encode`/`decode` with header and trailer CRCs
//! - **Catalog**: the fixed `(target, transaction id, message type)` per operation
//! - **Controller**: non-blocking operations, background sequences, observable state
//! - **Transport-agnostic**: BLE I/O lives behind the [`Transport`] trait
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use camlink::{Controller, DeviceInfo, DeviceModel, StreamConfig, Transport};
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! async fn run(transport: Arc<dyn Transport>) -> camlink::Result<()> {
//!     let controller = Controller::new(transport);
//!     let mut updates = Box::pin(controller.subscribe());
//!
//!     let camera = DeviceInfo::new("AA:BB:CC:DD:EE:FF", "Action 5", DeviceModel::OsmoAction5Pro);
//!     let id = camera.id.clone();
//!     controller.connect(camera).await?;
//!     controller
//!         .configure_streaming(&id, StreamConfig::new("Field", "secret", "rtmp://ingest/live/key"))
//!         .await?;
//!
//!     while let Some(update) = updates.next().await {
//!         println!("{:?}", update);
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg(any(test, feature = "test-utils", feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Wire protocol
pub mod protocol;

// Session control
pub mod controller;
pub mod session;
pub mod stream;
pub mod transport;

// Core exports
pub use config::{ControllerConfig, Timeouts};
pub use error::*;
pub use types::*;

pub use controller::Controller;
pub use protocol::{Command, Message, Operation};
pub use stream::CoalesceExt;
pub use transport::{NotificationSink, Transport};
