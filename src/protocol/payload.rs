//! Payload builders for outbound commands and interpreters for responses.

use tracing::warn;

use super::Message;
use crate::types::{Resolution, Stabilization, StreamConfig};
use crate::{CamlinkError, Result};

const MAX_SSID_LEN: usize = 32;
const MAX_PASSWORD_LEN: usize = 64;
const MAX_RTMP_URL_LEN: usize = 256;

/// Vendor pairing token: length byte followed by 32 ASCII hex digits.
const PAIR_TOKEN: [u8; 33] = [
    0x20, 0x32, 0x38, 0x34, 0x61, 0x65, 0x35, 0x62, 0x38, 0x64, 0x37, 0x36, 0x62, 0x33, 0x33,
    0x37, 0x35, 0x61, 0x30, 0x34, 0x61, 0x36, 0x34, 0x31, 0x37, 0x61, 0x64, 0x37, 0x31, 0x62,
    0x65, 0x61, 0x33,
];
const PAIR_PIN: &str = "mbln";

const STOP_STREAMING: [u8; 6] = [0x01, 0x01, 0x1A, 0x00, 0x01, 0x02];
const CONFIRM_START: [u8; 6] = [0x01, 0x01, 0x1A, 0x00, 0x01, 0x01];
const PREPARING_TO_LIVESTREAM: [u8; 1] = [0x1A];

const CONFIGURE_PREFIX: [u8; 2] = [0x01, 0x01];
const CONFIGURE_INFIX: [u8; 2] = [0x00, 0x01];

/// Notifications of this type carry battery telemetry.
pub const BATTERY_STATUS_TYPE: u32 = 0x020D00;
const BATTERY_OFFSET: usize = 20;
/// Battery level before the camera has reported one.
pub const BATTERY_UNKNOWN: i32 = -1;

/// Vendor token followed by the length-prefixed PIN.
pub fn pair() -> Vec<u8> {
    let mut payload = PAIR_TOKEN.to_vec();
    push_short_string(&mut payload, PAIR_PIN.as_bytes());
    payload
}

/// `len ssid len password`, both trimmed and capped.
pub fn setup_wifi(ssid: &str, password: &str) -> Result<Vec<u8>> {
    let ssid = trimmed(ssid, MAX_SSID_LEN);
    if ssid.is_empty() {
        return Err(CamlinkError::validation("wifi_ssid", "must not be empty"));
    }
    let password = trimmed(password, MAX_PASSWORD_LEN);

    let mut payload = Vec::with_capacity(2 + ssid.len() + password.len());
    push_short_string(&mut payload, ssid);
    push_short_string(&mut payload, password);
    Ok(payload)
}

/// `01 01 <class> 00 01 <stabilization>`; class byte is `0x1A` for high-end
/// models and `0x08` otherwise.
pub fn configure(stabilization: Stabilization, high_end: bool) -> Vec<u8> {
    let mut payload = Vec::with_capacity(6);
    payload.extend_from_slice(&CONFIGURE_PREFIX);
    payload.push(if high_end { 0x1A } else { 0x08 });
    payload.extend_from_slice(&CONFIGURE_INFIX);
    payload.push(stabilization_code(stabilization));
    payload
}

/// `00 <model> 00 <resolution> <bitrate u16> 02 00 <fps> 00 00 00 <url len u8> 00 <url>`.
///
/// The model byte is `0x2A` for high-end models and `0x2E` otherwise. The
/// URL is trimmed and capped at 256 bytes.
pub fn start_streaming(config: &StreamConfig) -> Result<Vec<u8>> {
    let url = trimmed(&config.rtmp_url, MAX_RTMP_URL_LEN);
    if url.is_empty() {
        return Err(CamlinkError::validation("rtmp_url", "must not be empty"));
    }

    let mut payload = Vec::with_capacity(14 + url.len());
    payload.push(0x00);
    payload.push(if config.is_high_end_model { 0x2A } else { 0x2E });
    payload.push(0x00);
    payload.push(resolution_code(config.resolution));
    payload.extend_from_slice(&config.bitrate_kbps.to_le_bytes());
    payload.extend_from_slice(&[0x02, 0x00]);
    payload.push(fps_code(config.fps));
    payload.extend_from_slice(&[0x00, 0x00, 0x00]);
    if url.len() > usize::from(u8::MAX) {
        warn!("RTMP URL of {} bytes wraps its one-byte length field", url.len());
    }
    payload.push(url.len() as u8);
    payload.push(0x00);
    payload.extend_from_slice(url);
    Ok(payload)
}

/// Same six bytes as [`confirm_start`] except the last, `0x02`.
pub fn stop_streaming() -> Vec<u8> {
    STOP_STREAMING.to_vec()
}

/// Sent after streaming starts on high-end models; ends in `0x01`.
pub fn confirm_start() -> Vec<u8> {
    CONFIRM_START.to_vec()
}

/// Single fixed byte announcing the livestream setup.
pub fn preparing_to_livestream() -> Vec<u8> {
    PREPARING_TO_LIVESTREAM.to_vec()
}

/// 480p is `0x47`, 720p `0x04`, 1080p `0x0A`.
pub fn resolution_code(resolution: Resolution) -> u8 {
    match resolution {
        Resolution::R480p => 0x47,
        Resolution::R720p => 0x04,
        Resolution::R1080p => 0x0A,
    }
}

/// 25 and 30 fps are supported; anything else streams at 30.
pub fn fps_code(fps: u32) -> u8 {
    match fps {
        25 => 2,
        _ => 3,
    }
}

/// Off through horizon-balance map to 0..=4.
pub fn stabilization_code(stabilization: Stabilization) -> u8 {
    match stabilization {
        Stabilization::Off => 0,
        Stabilization::RockSteady => 1,
        Stabilization::HorizonSteady => 2,
        Stabilization::RockSteadyPlus => 3,
        Stabilization::HorizonBalance => 4,
    }
}

/// The camera joined the network: payload starts with `[0x00, 0x00]`.
pub fn is_wifi_setup_success(payload: &[u8]) -> bool {
    payload.starts_with(&[0x00, 0x00])
}

/// Pairing was a no-op: payload starts with `[0x00, 0x01]`.
pub fn is_already_paired(payload: &[u8]) -> bool {
    payload.starts_with(&[0x00, 0x01])
}

/// Battery percentage carried by a notification, or [`BATTERY_UNKNOWN`].
pub fn battery_percentage(message: &Message) -> i32 {
    if message.message_type != BATTERY_STATUS_TYPE {
        return BATTERY_UNKNOWN;
    }
    message.payload.get(BATTERY_OFFSET).map_or(BATTERY_UNKNOWN, |&level| i32::from(level))
}

fn trimmed(value: &str, max: usize) -> &[u8] {
    let bytes = value.trim().as_bytes();
    &bytes[..bytes.len().min(max)]
}

fn push_short_string(buf: &mut Vec<u8>, value: &[u8]) {
    buf.push(value.len() as u8);
    buf.extend_from_slice(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wifi_payload_layout() {
        let payload = setup_wifi("TestSSID", "TestPass").unwrap();
        assert_eq!(payload.len(), 18);
        assert_eq!(payload[0], 8);
        assert_eq!(&payload[1..9], b"TestSSID");
        assert_eq!(payload[9], 8);
        assert_eq!(&payload[10..], b"TestPass");
    }

    #[test]
    fn wifi_fields_are_trimmed_and_capped() {
        let payload = setup_wifi("  home  ", &"p".repeat(80)).unwrap();
        assert_eq!(payload[0], 4);
        assert_eq!(&payload[1..5], b"home");
        assert_eq!(payload[5], 64);
        assert_eq!(payload.len(), 1 + 4 + 1 + 64);

        let payload = setup_wifi(&"s".repeat(40), "").unwrap();
        assert_eq!(payload[0], 32);
        assert_eq!(payload[33], 0);
    }

    #[test]
    fn empty_ssid_is_rejected() {
        assert!(matches!(
            setup_wifi("   ", "pw"),
            Err(CamlinkError::Validation { field: "wifi_ssid", .. })
        ));
    }

    #[test]
    fn pair_payload_carries_token_and_pin() {
        let payload = pair();
        assert_eq!(payload.len(), 33 + 1 + 4);
        assert_eq!(payload[0], 32);
        assert_eq!(payload[33], 4);
        assert_eq!(&payload[34..], b"mbln");
    }

    #[test]
    fn configure_payload_by_model_class() {
        assert_eq!(
            configure(Stabilization::HorizonBalance, true),
            vec![0x01, 0x01, 0x1A, 0x00, 0x01, 0x04]
        );
        assert_eq!(configure(Stabilization::Off, false), vec![0x01, 0x01, 0x08, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn start_streaming_payload_layout() {
        let config = StreamConfig::new("net", "pw", "rtmp://a/b")
            .with_resolution(Resolution::R720p)
            .with_fps(25)
            .with_bitrate_kbps(0x1770);
        let payload = start_streaming(&config).unwrap();

        assert_eq!(
            &payload[..14],
            &[0x00, 0x2E, 0x00, 0x04, 0x70, 0x17, 0x02, 0x00, 0x02, 0x00, 0x00, 0x00, 10, 0x00]
        );
        assert_eq!(&payload[14..], b"rtmp://a/b");

        let high_end = StreamConfig { is_high_end_model: true, ..config };
        assert_eq!(start_streaming(&high_end).unwrap()[1], 0x2A);
    }

    #[test]
    fn start_streaming_caps_url() {
        let url = format!("rtmp://host/{}", "x".repeat(300));
        let payload = start_streaming(&StreamConfig::new("n", "p", url)).unwrap();
        assert_eq!(payload.len(), 14 + 256);
        // 256 wraps to zero in the length byte.
        assert_eq!(&payload[12..14], &[0x00, 0x00]);
    }

    #[test]
    fn start_streaming_rejects_empty_url() {
        let config = StreamConfig::new("net", "pw", " ");
        assert!(matches!(
            start_streaming(&config),
            Err(CamlinkError::Validation { field: "rtmp_url", .. })
        ));
    }

    #[test]
    fn codes() {
        assert_eq!(resolution_code(Resolution::R480p), 0x47);
        assert_eq!(resolution_code(Resolution::R1080p), 0x0A);
        assert_eq!(fps_code(25), 2);
        assert_eq!(fps_code(30), 3);
        assert_eq!(fps_code(60), 3);
        assert_eq!(stabilization_code(Stabilization::RockSteadyPlus), 3);
    }

    #[test]
    fn stop_and_confirm_differ_only_in_last_byte() {
        let stop = stop_streaming();
        let confirm = confirm_start();
        assert_eq!(stop[..5], confirm[..5]);
        assert_eq!((stop[5], confirm[5]), (0x02, 0x01));
    }

    #[test]
    fn response_interpreters() {
        assert!(is_wifi_setup_success(&[0, 0, 7]));
        assert!(!is_wifi_setup_success(&[0, 1]));
        assert!(!is_wifi_setup_success(&[0]));
        assert!(is_already_paired(&[0, 1]));
        assert!(!is_already_paired(&[0, 0]));
    }

    #[test]
    fn battery_extraction() {
        let mut payload = vec![0u8; 21];
        payload[20] = 87;
        let msg = Message::new(0, 0, BATTERY_STATUS_TYPE, payload.clone());
        assert_eq!(battery_percentage(&msg), 87);

        let short = Message::new(0, 0, BATTERY_STATUS_TYPE, vec![0u8; 20]);
        assert_eq!(battery_percentage(&short), BATTERY_UNKNOWN);

        let other = Message::new(0, 0, 0x8E0240, payload);
        assert_eq!(battery_percentage(&other), BATTERY_UNKNOWN);
    }
}
