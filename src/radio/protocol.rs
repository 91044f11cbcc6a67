//! # Radio Protocol Constants
//!
//! Core definitions for the escape-stuffed radio packet format.
//!
//! Wire layout of one packet:
//!
//! ```text
//! [0]       marker byte (0x5C)
//! [1..=4]   escaped body length, 4 ASCII digits, zero-padded decimal
//! [5..5+E)  escaped body (marker bytes doubled)
//! [5+E]     marker byte (terminator, unescaped)
//! ```

/// Marker byte: packet start, escape character and terminator (`\`)
pub const MARKER_BYTE: u8 = 0x5C;

/// Header size: marker byte plus 4-digit length field
pub const HEADER_SIZE: usize = 5;

/// Maximum raw payload per wire packet; longer payloads are split into
/// consecutive independent packets and are not reassembled by the receiver
pub const MAX_RAW_CHUNK_SIZE: usize = 3072;

/// Largest escaped body length representable by the 4-digit length field
pub const MAX_ESCAPED_SIZE: usize = 9999;

/// Parse the 4-digit length field following a packet marker
///
/// Returns `None` unless all 4 bytes are ASCII digits.
pub fn parse_length_field(field: &[u8; 4]) -> Option<usize> {
    let mut length = 0usize;
    for &byte in field {
        if !byte.is_ascii_digit() {
            return None;
        }
        length = length * 10 + (byte - b'0') as usize;
    }
    Some(length)
}

/// Format an escaped body length as the 4-digit zero-padded field
///
/// Callers must have rejected lengths above [`MAX_ESCAPED_SIZE`].
pub fn format_length_field(length: usize) -> [u8; 4] {
    debug_assert!(length <= MAX_ESCAPED_SIZE);
    [
        b'0' + (length / 1000 % 10) as u8,
        b'0' + (length / 100 % 10) as u8,
        b'0' + (length / 10 % 10) as u8,
        b'0' + (length % 10) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_constants() {
        assert_eq!(MARKER_BYTE, b'\\');
        assert_eq!(HEADER_SIZE, 5);
        assert_eq!(MAX_RAW_CHUNK_SIZE, 3072);
        // Worst case: every raw byte is a marker, doubling to 6144,
        // which still fits the 4-digit length field
        assert!(MAX_RAW_CHUNK_SIZE * 2 <= MAX_ESCAPED_SIZE);
    }

    #[test]
    fn test_parse_length_field() {
        assert_eq!(parse_length_field(b"0000"), Some(0));
        assert_eq!(parse_length_field(b"0042"), Some(42));
        assert_eq!(parse_length_field(b"9999"), Some(9999));
        assert_eq!(parse_length_field(b"12a4"), None);
        assert_eq!(parse_length_field(b"\\\\\\\\"), None);
    }

    #[test]
    fn test_format_length_field() {
        assert_eq!(&format_length_field(0), b"0000");
        assert_eq!(&format_length_field(7), b"0007");
        assert_eq!(&format_length_field(314), b"0314");
        assert_eq!(&format_length_field(6144), b"6144");
        assert_eq!(&format_length_field(9999), b"9999");
    }

    #[test]
    fn test_format_parse_roundtrip() {
        for length in [0usize, 1, 9, 10, 99, 100, 999, 1000, 3072, 6144, 9999] {
            assert_eq!(parse_length_field(&format_length_field(length)), Some(length));
        }
    }
}
