//! Wire message framing.
//!
//! ## Layout
//!
//! All integers are little-endian. Overhead is 13 bytes plus the payload.
//!
//! | Offset | Field |
//! |---|---|
//! | 0 | start byte `0x55` |
//! | 1 | total length (u8) |
//! | 2 | version `0x04` |
//! | 3 | CRC8 over bytes 0..3 |
//! | 4..6 | target (u16) |
//! | 6..8 | transaction id (u16) |
//! | 8..11 | message type (u24) |
//! | 11..len-2 | payload |
//! | len-2..len | CRC16 over everything before it |

use tracing::{trace, warn};

use super::crc::{crc8, crc16};
use crate::DecodeError;

pub const START_BYTE: u8 = 0x55;
pub const VERSION: u8 = 0x04;
/// Header, addressing fields and trailer.
pub const FRAME_OVERHEAD: usize = 13;

const HEADER_LEN: usize = 4;
const PAYLOAD_OFFSET: usize = 11;
const TRAILER_LEN: usize = 2;

/// One framed message, outbound command or inbound notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message {
    pub target: u16,
    pub transaction_id: u16,
    /// 24-bit value; the top byte is never put on the wire.
    pub message_type: u32,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(target: u16, transaction_id: u16, message_type: u32, payload: Vec<u8>) -> Self {
        Self { target, transaction_id, message_type, payload }
    }

    /// Frame the message for writing.
    ///
    /// The length byte is the total frame length truncated to a single byte.
    /// Payloads longer than 242 bytes wrap it; the frame is still produced so
    /// wire behaviour matches what cameras have been observed to accept.
    pub fn encode(&self) -> Vec<u8> {
        let total = FRAME_OVERHEAD + self.payload.len();
        if total > usize::from(u8::MAX) {
            warn!(
                "Frame length {} exceeds the one-byte length field (transaction {:#06x})",
                total, self.transaction_id
            );
        }

        let mut buf = Vec::with_capacity(total);
        buf.push(START_BYTE);
        buf.push(total as u8);
        buf.push(VERSION);
        buf.push(crc8(&buf[..3]));
        buf.extend_from_slice(&self.target.to_le_bytes());
        buf.extend_from_slice(&self.transaction_id.to_le_bytes());
        buf.extend_from_slice(&self.message_type.to_le_bytes()[..3]);
        buf.extend_from_slice(&self.payload);
        let trailer = crc16(&buf);
        buf.extend_from_slice(&trailer.to_le_bytes());
        buf
    }

    /// Parse and verify a frame.
    ///
    /// Checks run in a fixed order (start byte, length, version, header CRC,
    /// trailer CRC) so each failure is reported by its own variant. Bytes past
    /// the declared length are ignored.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let Some(&start) = data.first() else {
            return Err(DecodeError::Truncated { declared: FRAME_OVERHEAD, actual: 0 });
        };
        if start != START_BYTE {
            return Err(DecodeError::InvalidStartByte { found: start });
        }

        let declared = data.get(1).map_or(FRAME_OVERHEAD, |&len| usize::from(len));
        if data.len() < FRAME_OVERHEAD || declared < FRAME_OVERHEAD || data.len() < declared {
            return Err(DecodeError::Truncated { declared, actual: data.len() });
        }
        if data.len() > declared {
            trace!("Ignoring {} bytes past declared frame length", data.len() - declared);
        }
        let frame = &data[..declared];

        if frame[2] != VERSION {
            return Err(DecodeError::InvalidVersion { found: frame[2] });
        }

        let expected = crc8(&frame[..3]);
        if frame[3] != expected {
            return Err(DecodeError::HeaderCrcMismatch { expected, found: frame[3] });
        }

        let body_end = declared - TRAILER_LEN;
        let expected = crc16(&frame[..body_end]);
        let found = u16::from_le_bytes([frame[body_end], frame[body_end + 1]]);
        if found != expected {
            return Err(DecodeError::TrailerCrcMismatch { expected, found });
        }

        Ok(Self {
            target: u16::from_le_bytes([frame[HEADER_LEN], frame[HEADER_LEN + 1]]),
            transaction_id: u16::from_le_bytes([frame[6], frame[7]]),
            message_type: u32::from_le_bytes([frame[8], frame[9], frame[10], 0]),
            payload: frame[PAYLOAD_OFFSET..body_end].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stop_frame() -> Vec<u8> {
        vec![
            0x55, 0x13, 0x04, 0xA5, 0x02, 0x08, 0xC8, 0xEA, 0x40, 0x02, 0x8E, 0x01, 0x01, 0x1A,
            0x00, 0x01, 0x02, 0x67, 0x37,
        ]
    }

    #[test]
    fn encodes_captured_stop_frame() {
        let msg = Message::new(0x0802, 0xEAC8, 0x8E0240, vec![0x01, 0x01, 0x1A, 0x00, 0x01, 0x02]);
        assert_eq!(msg.encode(), stop_frame());
    }

    #[test]
    fn decodes_captured_stop_frame() {
        let msg = Message::decode(&stop_frame()).unwrap();
        assert_eq!(msg.target, 0x0802);
        assert_eq!(msg.transaction_id, 0xEAC8);
        assert_eq!(msg.message_type, 0x8E0240);
        assert_eq!(msg.payload, vec![0x01, 0x01, 0x1A, 0x00, 0x01, 0x02]);
    }

    #[test]
    fn empty_payload_decodes_to_empty_vec() {
        let encoded = Message::new(0, 0, 0, Vec::new()).encode();
        assert_eq!(encoded, vec![0x55, 0x0D, 0x04, 0x95, 0, 0, 0, 0, 0, 0, 0, 0x0D, 0xA3]);

        let decoded = Message::decode(&encoded).unwrap();
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn wrong_start_byte_is_reported_first() {
        // Valid CRCs everywhere except the start byte.
        let mut frame = stop_frame();
        frame[0] = 0xAA;
        assert_eq!(Message::decode(&frame), Err(DecodeError::InvalidStartByte { found: 0xAA }));
    }

    #[test]
    fn short_buffers_are_truncated() {
        assert!(matches!(Message::decode(&[]), Err(DecodeError::Truncated { actual: 0, .. })));
        assert!(matches!(Message::decode(&[0x55]), Err(DecodeError::Truncated { .. })));

        let frame = stop_frame();
        assert_eq!(
            Message::decode(&frame[..18]),
            Err(DecodeError::Truncated { declared: 19, actual: 18 })
        );
    }

    #[test]
    fn declared_length_below_overhead_is_truncated() {
        let mut frame = stop_frame();
        frame[1] = 5;
        assert!(matches!(Message::decode(&frame), Err(DecodeError::Truncated { declared: 5, .. })));
    }

    #[test]
    fn wrong_version_is_reported_before_crc() {
        let mut frame = stop_frame();
        frame[2] = 0x03;
        assert_eq!(Message::decode(&frame), Err(DecodeError::InvalidVersion { found: 0x03 }));
    }

    #[test]
    fn corrupted_header_crc_fails_before_payload() {
        let mut frame = stop_frame();
        frame[3] ^= 0xFF;
        assert!(matches!(Message::decode(&frame), Err(DecodeError::HeaderCrcMismatch { .. })));
    }

    #[test]
    fn corrupted_trailer_fails_after_header_parses() {
        let mut frame = stop_frame();
        frame[18] ^= 0x01;
        assert_eq!(
            Message::decode(&frame),
            Err(DecodeError::TrailerCrcMismatch { expected: 0x3767, found: 0x3667 })
        );

        let mut frame = stop_frame();
        frame[12] ^= 0x10;
        assert!(matches!(Message::decode(&frame), Err(DecodeError::TrailerCrcMismatch { .. })));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut frame = stop_frame();
        frame.extend_from_slice(&[0xDE, 0xAD]);
        assert_eq!(Message::decode(&frame).unwrap().payload.len(), 6);
    }

    #[test]
    fn oversized_payload_wraps_length_byte() {
        let msg = Message::new(1, 2, 3, vec![0xAB; 250]);
        let encoded = msg.encode();
        assert_eq!(encoded.len(), 263);
        assert_eq!(encoded[1], (263usize % 256) as u8);
    }

    #[test]
    fn message_type_keeps_24_bits() {
        let msg = Message::new(0, 0, 0xFF45_0740, Vec::new());
        let decoded = Message::decode(&msg.encode()).unwrap();
        assert_eq!(decoded.message_type, 0x45_0740);
    }

    proptest! {
        #[test]
        fn decode_reverses_encode(
            target in any::<u16>(),
            transaction_id in any::<u16>(),
            message_type in 0u32..0x0100_0000,
            payload in prop::collection::vec(any::<u8>(), 0..=242),
        ) {
            let msg = Message::new(target, transaction_id, message_type, payload);
            let encoded = msg.encode();
            prop_assert_eq!(encoded.len(), FRAME_OVERHEAD + msg.payload.len());
            prop_assert_eq!(usize::from(encoded[1]), encoded.len());
            prop_assert_eq!(Message::decode(&encoded).unwrap(), msg);
        }
    }
}
