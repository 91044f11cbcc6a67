//! # Radio Packet Encoder
//!
//! Encodes raw byte payloads into escape-stuffed, length-prefixed wire
//! packets. Payloads longer than [`MAX_RAW_CHUNK_SIZE`] are split into
//! consecutive independent packets in original order; the receiver decodes
//! each one on its own and does not reassemble them.

use super::escape::stuff;
use super::protocol::*;
use crate::error::{Result, TelemetryBridgeError};

/// One encoded wire packet together with its size accounting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPacket {
    /// Raw payload bytes carried by this packet
    pub raw_size: usize,

    /// Body length after escape stuffing (the value in the length field)
    pub escaped_size: usize,

    /// Complete wire bytes: marker + length field + escaped body + terminator
    pub bytes: Vec<u8>,
}

/// Encode raw data into one or more wire packets
///
/// # Arguments
///
/// * `data` - Raw payload of any length; split into chunks of at most
///   [`MAX_RAW_CHUNK_SIZE`] bytes, one wire packet per chunk
///
/// # Errors
///
/// Returns [`TelemetryBridgeError::RadioProtocol`] if a chunk's escaped
/// body would not fit the 4-digit length field. Under the 3072-byte chunk
/// cap the worst case (every byte a marker) escapes to 6144 bytes, which
/// fits, so this cannot trigger for data produced by this encoder.
pub fn encode(data: &[u8]) -> Result<Vec<EncodedPacket>> {
    // An empty payload still produces one (empty) packet
    if data.is_empty() {
        return Ok(vec![encode_chunk(data)?]);
    }

    data.chunks(MAX_RAW_CHUNK_SIZE).map(encode_chunk).collect()
}

/// Encode a single raw chunk into one wire packet
///
/// # Errors
///
/// Returns an error if the escaped body exceeds [`MAX_ESCAPED_SIZE`].
fn encode_chunk(chunk: &[u8]) -> Result<EncodedPacket> {
    let escaped = stuff(chunk);

    if escaped.len() > MAX_ESCAPED_SIZE {
        return Err(TelemetryBridgeError::RadioProtocol(format!(
            "escaped body of {} bytes exceeds the {} byte length field limit",
            escaped.len(),
            MAX_ESCAPED_SIZE
        )));
    }

    let mut bytes = Vec::with_capacity(HEADER_SIZE + escaped.len() + 1);
    bytes.push(MARKER_BYTE);
    bytes.extend_from_slice(&format_length_field(escaped.len()));
    bytes.extend_from_slice(&escaped);
    bytes.push(MARKER_BYTE);

    Ok(EncodedPacket {
        raw_size: chunk.len(),
        escaped_size: escaped.len(),
        bytes,
    })
}
