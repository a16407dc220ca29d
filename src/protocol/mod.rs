//! Binary protocol spoken over the camera's BLE control characteristic.
//!
//! - [`crc`]: header and trailer checksums
//! - [`Message`]: framing with `encode`/`decode`
//! - [`payload`]: per-operation payload builders and response interpreters
//! - [`catalog`]: the fixed `(target, transaction id, message type)` table

pub mod catalog;
pub mod crc;
mod message;
pub mod payload;

pub use catalog::{Command, Operation, OperationSpec};
pub use message::{FRAME_OVERHEAD, Message, START_BYTE, VERSION};
