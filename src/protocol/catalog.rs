//! Fixed addressing for every command the controller issues.
//!
//! Transaction ids are constants per operation class, not counters. Stop and
//! Confirm-Start share one triple and can only be told apart by payload, so a
//! response to either cannot be attributed to one or the other.

use super::{Message, payload};
use crate::Result;
use crate::types::{Stabilization, StreamConfig};

/// Addressing triple of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationSpec {
    pub target: u16,
    pub transaction_id: u16,
    pub message_type: u32,
}

/// Logical operation classes known to the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Pair,
    StopStreaming,
    ConfirmStart,
    PreparingToLivestream,
    SetupWifi,
    Configure,
    StartStreaming,
}

impl Operation {
    pub const fn spec(self) -> OperationSpec {
        let (target, transaction_id, message_type) = match self {
            Operation::Pair => (0x0702, 0x8092, 0x45_0740),
            Operation::StopStreaming | Operation::ConfirmStart => (0x0802, 0xEAC8, 0x8E_0240),
            Operation::PreparingToLivestream => (0x0802, 0x8C12, 0xE1_0240),
            Operation::SetupWifi => (0x0702, 0x8C19, 0x47_0740),
            Operation::Configure => (0x0102, 0x8C2D, 0x8E_0240),
            Operation::StartStreaming => (0x0802, 0x8C2C, 0x78_0840),
        };
        OperationSpec { target, transaction_id, message_type }
    }

    /// Transaction id a response to this operation carries.
    pub const fn transaction_id(self) -> u16 {
        self.spec().transaction_id
    }
}

/// An operation together with the arguments its payload needs.
#[derive(Debug, Clone, Copy)]
pub enum Command<'a> {
    Pair,
    StopStreaming,
    ConfirmStart,
    PreparingToLivestream,
    SetupWifi { ssid: &'a str, password: &'a str },
    Configure { stabilization: Stabilization, high_end: bool },
    StartStreaming(&'a StreamConfig),
}

impl Command<'_> {
    pub fn operation(&self) -> Operation {
        match self {
            Command::Pair => Operation::Pair,
            Command::StopStreaming => Operation::StopStreaming,
            Command::ConfirmStart => Operation::ConfirmStart,
            Command::PreparingToLivestream => Operation::PreparingToLivestream,
            Command::SetupWifi { .. } => Operation::SetupWifi,
            Command::Configure { .. } => Operation::Configure,
            Command::StartStreaming(_) => Operation::StartStreaming,
        }
    }

    /// Build the message, validating required fields first.
    pub fn to_message(&self) -> Result<Message> {
        let payload = match *self {
            Command::Pair => payload::pair(),
            Command::StopStreaming => payload::stop_streaming(),
            Command::ConfirmStart => payload::confirm_start(),
            Command::PreparingToLivestream => payload::preparing_to_livestream(),
            Command::SetupWifi { ssid, password } => payload::setup_wifi(ssid, password)?,
            Command::Configure { stabilization, high_end } => {
                payload::configure(stabilization, high_end)
            }
            Command::StartStreaming(config) => payload::start_streaming(config)?,
        };
        let spec = self.operation().spec();
        Ok(Message::new(spec.target, spec.transaction_id, spec.message_type, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CamlinkError;

    #[test]
    fn stop_and_confirm_share_a_triple() {
        assert_eq!(Operation::StopStreaming.spec(), Operation::ConfirmStart.spec());
    }

    #[test]
    fn other_operations_have_distinct_transaction_ids() {
        let ids = [
            Operation::Pair,
            Operation::StopStreaming,
            Operation::PreparingToLivestream,
            Operation::SetupWifi,
            Operation::Configure,
            Operation::StartStreaming,
        ]
        .map(Operation::transaction_id);
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn command_builds_addressed_message() {
        let msg = Command::SetupWifi { ssid: "TestSSID", password: "TestPass" }.to_message().unwrap();
        assert_eq!(msg.target, 0x0702);
        assert_eq!(msg.transaction_id, 0x8C19);
        assert_eq!(msg.message_type, 0x47_0740);
        assert_eq!(msg.payload.len(), 18);
        assert_eq!(msg.encode().len(), 31);
    }

    #[test]
    fn validation_happens_before_encoding() {
        let config = StreamConfig::new("net", "pw", "");
        let err = Command::StartStreaming(&config).to_message().unwrap_err();
        assert!(matches!(err, CamlinkError::Validation { .. }));
    }
}
