//! Reflected CRCs guarding the message header and trailer.
//!
//! Both run LSB-first without a lookup table: each byte is XORed into the
//! register and shifted through eight rounds. Neither applies a final XOR.

const CRC8_SEED: u8 = 0xEE;
/// Bit-reversal of 0x31.
const CRC8_POLY: u8 = 0x8C;

const CRC16_SEED: u16 = 0x496C;
/// Bit-reversal of 0x1021.
const CRC16_POLY: u16 = 0x8408;

/// Header guard over start byte, length and version.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = CRC8_SEED;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x01 != 0 { (crc >> 1) ^ CRC8_POLY } else { crc >> 1 };
        }
    }
    crc
}

/// Trailer guard over every byte that precedes it.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = CRC16_SEED;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            crc = if crc & 0x0001 != 0 { (crc >> 1) ^ CRC16_POLY } else { crc >> 1 };
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn crc8_regression() {
        assert_eq!(crc8(&[0x55, 0x1A, 0x04]), 0x17);
        assert_eq!(crc8(&[0x55, 0x13, 0x04]), 0xA5);
        assert_eq!(crc8(b"123456789"), 0x15);
    }

    #[test]
    fn crc16_regression() {
        assert_eq!(crc16(b"123456789"), 0xB90E);

        // Captured stop-streaming frame without its trailer.
        let frame = [
            0x55, 0x13, 0x04, 0xA5, 0x02, 0x08, 0xC8, 0xEA, 0x40, 0x02, 0x8E, 0x01, 0x01, 0x1A,
            0x00, 0x01, 0x02,
        ];
        assert_eq!(crc16(&frame), 0x3767);
    }

    #[test]
    fn empty_input_returns_seed() {
        assert_eq!(crc8(&[]), CRC8_SEED);
        assert_eq!(crc16(&[]), CRC16_SEED);
    }

    proptest! {
        #[test]
        fn crcs_are_deterministic(data in prop::collection::vec(any::<u8>(), 0..300)) {
            prop_assert_eq!(crc8(&data), crc8(&data));
            prop_assert_eq!(crc16(&data), crc16(&data));
        }

        #[test]
        fn single_bit_flips_change_crc16(
            data in prop::collection::vec(any::<u8>(), 1..64),
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let mut flipped = data.clone();
            let i = index.index(flipped.len());
            flipped[i] ^= 1 << bit;
            prop_assert_ne!(crc16(&data), crc16(&flipped));
        }
    }
}
