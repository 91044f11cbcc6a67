//! # Escape-Byte Stuffing
//!
//! Byte-stuffing primitive for the radio packet body. The marker byte is
//! doubled inside payload data so a single, unescaped marker can always be
//! read as a frame delimiter.

use super::protocol::MARKER_BYTE;

/// Stuff a payload: every marker byte is doubled
///
/// Output length = input length + number of marker bytes in the input.
/// Pure and order-preserving; there is no error condition.
pub fn stuff(payload: &[u8]) -> Vec<u8> {
    let marker_count = payload.iter().filter(|&&b| b == MARKER_BYTE).count();
    let mut escaped = Vec::with_capacity(payload.len() + marker_count);

    for &byte in payload {
        escaped.push(byte);
        if byte == MARKER_BYTE {
            escaped.push(MARKER_BYTE);
        }
    }

    escaped
}

/// Unstuff an escaped body: every run of two marker bytes collapses to one
///
/// Only called on already-delimited body ranges; the packet marker and
/// terminator bytes are never part of the input.
pub fn unstuff(escaped: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(escaped.len());
    let mut i = 0;

    while i < escaped.len() {
        payload.push(escaped[i]);
        if escaped[i] == MARKER_BYTE && i + 1 < escaped.len() && escaped[i + 1] == MARKER_BYTE {
            i += 2;
        } else {
            i += 1;
        }
    }

    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stuff_no_markers() {
        let payload = b"hello world";
        assert_eq!(stuff(payload), payload.to_vec());
    }

    #[test]
    fn test_stuff_doubles_markers() {
        assert_eq!(stuff(b"\\"), b"\\\\".to_vec());
        assert_eq!(stuff(b"a\\b"), b"a\\\\b".to_vec());
        assert_eq!(stuff(b"\\\\"), b"\\\\\\\\".to_vec());
    }

    #[test]
    fn test_stuff_length_accounting() {
        let payload = b"a\\b\\c\\";
        let escaped = stuff(payload);
        // Output length = input length + marker count
        assert_eq!(escaped.len(), payload.len() + 3);
    }

    #[test]
    fn test_unstuff_inverse_of_stuff() {
        let cases: &[&[u8]] = &[
            b"",
            b"plain",
            b"\\",
            b"\\\\",
            b"lead\\ing",
            b"trailing\\",
            b"\\x\\y\\z\\",
        ];
        for &payload in cases {
            assert_eq!(unstuff(&stuff(payload)), payload.to_vec(), "payload: {payload:?}");
        }
    }

    #[test]
    fn test_unstuff_all_markers() {
        // 4 escaped bytes = 2 literal markers
        assert_eq!(unstuff(b"\\\\\\\\"), b"\\\\".to_vec());
    }
}
