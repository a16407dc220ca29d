//! Wire format checks against frames captured from real cameras.
//!
//! These go through the public API only: commands are built from the
//! catalog, encoded, and compared byte for byte.

use camlink::protocol::{FRAME_OVERHEAD, crc};
use camlink::{Command, DecodeError, Message, Operation};

const STOP_FRAME: [u8; 19] = [
    0x55, 0x13, 0x04, 0xA5, 0x02, 0x08, 0xC8, 0xEA, 0x40, 0x02, 0x8E, 0x01, 0x01, 0x1A, 0x00, 0x01,
    0x02, 0x67, 0x37,
];

const PREPARE_FRAME: [u8; 14] =
    [0x55, 0x0E, 0x04, 0xC0, 0x02, 0x08, 0x12, 0x8C, 0x40, 0x02, 0xE1, 0x1A, 0x8F, 0xC0];

const WIFI_FRAME: [u8; 20] = [
    0x55, 0x14, 0x04, 0xCB, 0x02, 0x07, 0x19, 0x8C, 0x40, 0x07, 0x47, 0x03, b'n', b'e', b't', 0x02,
    b'p', b'w', 0xAC, 0x5F,
];

#[test]
fn catalog_commands_encode_to_captured_frames() {
    let cases: [(Command<'_>, &[u8]); 3] = [
        (Command::StopStreaming, &STOP_FRAME),
        (Command::PreparingToLivestream, &PREPARE_FRAME),
        (Command::SetupWifi { ssid: "net", password: "pw" }, &WIFI_FRAME),
    ];

    for (command, expected) in cases {
        let encoded = command.to_message().unwrap().encode();
        assert_eq!(encoded, expected, "{:?}", command.operation());
    }
}

#[test]
fn captured_frames_decode_to_catalog_triples() {
    let stop = Message::decode(&STOP_FRAME).unwrap();
    let spec = Operation::StopStreaming.spec();
    assert_eq!(stop.target, spec.target);
    assert_eq!(stop.transaction_id, spec.transaction_id);
    assert_eq!(stop.message_type, spec.message_type);
    assert_eq!(stop.payload, vec![0x01, 0x01, 0x1A, 0x00, 0x01, 0x02]);

    let wifi = Message::decode(&WIFI_FRAME).unwrap();
    assert_eq!(wifi.transaction_id, Operation::SetupWifi.transaction_id());
    assert_eq!(wifi.payload.len(), WIFI_FRAME.len() - FRAME_OVERHEAD);
}

#[test]
fn stop_and_confirm_share_one_triple() {
    let stop = Command::StopStreaming.to_message().unwrap();
    let confirm = Command::ConfirmStart.to_message().unwrap();

    assert_eq!(
        (stop.target, stop.transaction_id, stop.message_type),
        (confirm.target, confirm.transaction_id, confirm.message_type)
    );
    assert_ne!(stop.payload, confirm.payload);
}

#[test]
fn checksums_cover_the_documented_ranges() {
    assert_eq!(crc::crc8(&STOP_FRAME[..3]), STOP_FRAME[3]);
    let trailer = u16::from_le_bytes([STOP_FRAME[17], STOP_FRAME[18]]);
    assert_eq!(crc::crc16(&STOP_FRAME[..17]), trailer);
}

#[test]
fn corrupted_captures_are_rejected() {
    let mut frame = STOP_FRAME;
    frame[12] ^= 0x01;
    assert!(matches!(Message::decode(&frame), Err(DecodeError::TrailerCrcMismatch { .. })));

    let mut frame = STOP_FRAME;
    frame[3] = 0x00;
    assert!(matches!(Message::decode(&frame), Err(DecodeError::HeaderCrcMismatch { .. })));

    assert!(matches!(
        Message::decode(&STOP_FRAME[..10]),
        Err(DecodeError::Truncated { declared: 19, actual: 10 })
    ));
}

#[test]
fn notification_stream_with_trailing_garbage_still_decodes() {
    let mut buffer = PREPARE_FRAME.to_vec();
    buffer.extend_from_slice(&[0xDE, 0xAD]);

    let message = Message::decode(&buffer).unwrap();
    assert_eq!(message.transaction_id, Operation::PreparingToLivestream.transaction_id());
    assert_eq!(message.payload, vec![0x1A]);
}
