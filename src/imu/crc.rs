//! # Sensor Frame Checksums
//!
//! The two checksums carried by IMU frames:
//!
//! - **CRC-8**, polynomial 0x107, initial value 0xFF, unreflected: covers
//!   the first 4 header bytes.
//! - **CRC-16**, polynomial 0x18005, initial value 0xFFFF, reflected
//!   (MODBUS parameterization): covers the payload, transmitted
//!   little-endian.

/// CRC-8 polynomial (x^8 + x^2 + x + 1, top bit implied)
const CRC8_POLY: u8 = 0x07;

/// CRC-16 polynomial 0x8005, bit-reversed for the reflected algorithm
const CRC16_POLY_REFLECTED: u16 = 0xA001;

/// Precomputed CRC-8 lookup table
const CRC8_TABLE: [u8; 256] = generate_crc8_table();

/// Precomputed reflected CRC-16 lookup table
const CRC16_TABLE: [u16; 256] = generate_crc16_table();

/// Generate the CRC-8 lookup table at compile time
const fn generate_crc8_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u8;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x80) != 0 {
                crc = (crc << 1) ^ CRC8_POLY;
            } else {
                crc <<= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Generate the reflected CRC-16 lookup table at compile time
const fn generate_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u16;
        let mut j = 0;

        while j < 8 {
            if (crc & 1) != 0 {
                crc = (crc >> 1) ^ CRC16_POLY_REFLECTED;
            } else {
                crc >>= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Calculate the header CRC-8 using the lookup table
pub fn crc8_header(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;

    for &byte in data {
        crc = CRC8_TABLE[(crc ^ byte) as usize];
    }

    crc
}

/// Calculate the payload CRC-16 using the lookup table
pub fn crc16_payload(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;

    for &byte in data {
        crc = (crc >> 8) ^ CRC16_TABLE[((crc ^ byte as u16) & 0xFF) as usize];
    }

    crc
}

/// Bitwise CRC-8, for verifying the lookup table implementation
#[allow(dead_code)]
fn crc8_header_slow(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;

    for &byte in data {
        crc ^= byte;

        for _ in 0..8 {
            if (crc & 0x80) != 0 {
                crc = (crc << 1) ^ CRC8_POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}

/// Bitwise CRC-16, for verifying the lookup table implementation
#[allow(dead_code)]
fn crc16_payload_slow(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;

    for &byte in data {
        crc ^= byte as u16;

        for _ in 0..8 {
            if (crc & 1) != 0 {
                crc = (crc >> 1) ^ CRC16_POLY_REFLECTED;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc8_empty() {
        // Empty input leaves the initial value untouched
        assert_eq!(crc8_header(&[]), 0xFF);
    }

    #[test]
    fn test_crc8_lookup_table_matches_slow() {
        let test_data: &[&[u8]] = &[
            &[0x00],
            &[0xFF],
            &[0xFC, 0x40, 0x38, 0x01],
            &[0xFC, 0x41, 0x30, 0x7F],
            &[0x01, 0x02, 0x03, 0x04, 0x05],
            &[0xAA; 32],
        ];

        for data in test_data {
            assert_eq!(
                crc8_header(data),
                crc8_header_slow(data),
                "CRC-8 mismatch for data: {data:?}"
            );
        }
    }

    #[test]
    fn test_crc16_known_vector() {
        // MODBUS check value for the standard "123456789" test string
        assert_eq!(crc16_payload(b"123456789"), 0x4B37);
    }

    #[test]
    fn test_crc16_lookup_table_matches_slow() {
        let test_data: &[&[u8]] = &[
            &[],
            &[0x00],
            &[0xFF, 0xFE, 0xFD],
            &[0x00; 56],
            &[0x5A; 48],
        ];

        for data in test_data {
            assert_eq!(
                crc16_payload(data),
                crc16_payload_slow(data),
                "CRC-16 mismatch for data: {data:?}"
            );
        }
    }

    #[test]
    fn test_crc_changes_with_data() {
        assert_ne!(crc8_header(&[0xFC, 0x40, 0x38, 0x01]), crc8_header(&[0xFC, 0x40, 0x38, 0x02]));
        assert_ne!(crc16_payload(b"sample-a"), crc16_payload(b"sample-b"));
    }

    #[test]
    fn test_crc16_detects_single_bit_flip() {
        let mut payload = [0x11u8; 56];
        let original = crc16_payload(&payload);
        payload[20] ^= 0x04;
        assert_ne!(crc16_payload(&payload), original);
    }
}
