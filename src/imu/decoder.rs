//! # Sensor Frame Validation and Decoding
//!
//! Validates candidate frames cut out by the extractor and unpacks their
//! payloads into typed samples.
//!
//! The sensor firmware transmits two checksums but historically the ground
//! software computed and ignored them; corrupted frames were delivered
//! anyway. Validation compares both checksums by default, and the old
//! lenient behavior remains available behind
//! [`crate::config::ImuConfig::lenient_checksums`] for bring-up against
//! hardware with known-bad checksum firmware.

use tracing::{debug, trace};

use super::crc::{crc16_payload, crc8_header};
use super::protocol::*;

/// Validate a candidate frame and decode it into a typed sample
///
/// Returns `None` for any malformed, corrupted or unknown-type frame; the
/// frame is simply dropped and the extractor re-aligns independently, so
/// there is nothing to recover here.
///
/// With `lenient_checksums` set, both checksums are computed but mismatches
/// are only logged, reproducing the legacy behavior.
pub fn decode_frame(frame: &[u8], lenient_checksums: bool) -> Option<TelemetrySample> {
    if frame.len() < MIN_FRAME_SIZE {
        return None;
    }

    let start = frame[0];
    let frame_type = frame[1];
    let declared_len = frame[2] as usize;
    let sequence = frame[3];
    let header_crc = frame[4];

    if start != FRAME_START || *frame.last()? != FRAME_END {
        return None;
    }

    let computed_crc8 = crc8_header(&frame[..4]);
    if computed_crc8 != header_crc {
        debug!(
            sequence,
            expected = header_crc,
            computed = computed_crc8,
            "header checksum mismatch"
        );
        if !lenient_checksums {
            return None;
        }
    }

    if declared_len + FRAME_OVERHEAD != frame.len() {
        debug!(
            sequence,
            declared_len,
            frame_len = frame.len(),
            "declared payload length does not match frame size"
        );
        return None;
    }

    let payload_crc = u16::from_le_bytes([frame[5], frame[6]]);
    let payload = &frame[7..frame.len() - 1];

    let computed_crc16 = crc16_payload(payload);
    if computed_crc16 != payload_crc {
        debug!(
            sequence,
            expected = payload_crc,
            computed = computed_crc16,
            "payload checksum mismatch"
        );
        if !lenient_checksums {
            return None;
        }
    }

    // Type dispatch requires the type's fixed payload length; anything else
    // is dropped silently
    match (frame_type, declared_len) {
        (TYPE_INERTIAL, INERTIAL_PAYLOAD_LEN) => {
            Some(TelemetrySample::Inertial(decode_inertial(payload)?))
        }
        (TYPE_ATTITUDE, ATTITUDE_PAYLOAD_LEN) => {
            Some(TelemetrySample::Attitude(decode_attitude(payload)?))
        }
        _ => {
            trace!(frame_type, declared_len, "unknown frame type or length, dropping");
            None
        }
    }
}

/// Unpack a 56-byte inertial payload: 12 little-endian floats and a
/// 64-bit timestamp
pub fn decode_inertial(payload: &[u8]) -> Option<InertialSample> {
    if payload.len() != INERTIAL_PAYLOAD_LEN {
        return None;
    }

    let mut fields = FieldReader::new(payload);
    Some(InertialSample {
        angular_velocity_x: fields.f32()?,
        angular_velocity_y: fields.f32()?,
        angular_velocity_z: fields.f32()?,
        acceleration_x: fields.f32()?,
        acceleration_y: fields.f32()?,
        acceleration_z: fields.f32()?,
        magnetic_x: fields.f32()?,
        magnetic_y: fields.f32()?,
        magnetic_z: fields.f32()?,
        imu_temperature: fields.f32()?,
        pressure: fields.f32()?,
        pressure_temperature: fields.f32()?,
        timestamp: fields.u64()?,
    })
}

/// Unpack a 48-byte attitude payload: 10 little-endian floats and a
/// 64-bit timestamp
pub fn decode_attitude(payload: &[u8]) -> Option<AttitudeSample> {
    if payload.len() != ATTITUDE_PAYLOAD_LEN {
        return None;
    }

    let mut fields = FieldReader::new(payload);
    Some(AttitudeSample {
        roll_rate: fields.f32()?,
        pitch_rate: fields.f32()?,
        heading_rate: fields.f32()?,
        roll: fields.f32()?,
        pitch: fields.f32()?,
        heading: fields.f32()?,
        q1: fields.f32()?,
        q2: fields.f32()?,
        q3: fields.f32()?,
        q4: fields.f32()?,
        timestamp: fields.u64()?,
    })
}

/// Sequential little-endian field reader over a payload slice
struct FieldReader<'a> {
    payload: &'a [u8],
    offset: usize,
}

impl<'a> FieldReader<'a> {
    fn new(payload: &'a [u8]) -> Self {
        Self { payload, offset: 0 }
    }

    fn f32(&mut self) -> Option<f32> {
        let bytes = self.take(4)?;
        Some(f32::from_le_bytes(bytes.try_into().ok()?))
    }

    fn u64(&mut self) -> Option<u64> {
        let bytes = self.take(8)?;
        Some(u64::from_le_bytes(bytes.try_into().ok()?))
    }

    fn take(&mut self, count: usize) -> Option<&'a [u8]> {
        let bytes = self.payload.get(self.offset..self.offset + count)?;
        self.offset += count;
        Some(bytes)
    }
}


#[cfg(test)]
mod tests {
    use super::test_frames::*;
    use super::*;

    const INERTIAL_VALUES: [f32; 12] = [
        1.5, -2.25, 3.125, 9.81, -0.5, 0.0625, 22.4, -17.0, 48.75, 36.6, 101325.0, 35.2,
    ];

    #[test]
    fn test_decode_valid_inertial_frame() {
        let payload = inertial_payload(&INERTIAL_VALUES, 0x0102_0304_0506_0708);
        let frame = build_frame(TYPE_INERTIAL, 7, &payload);

        let sample = match decode_frame(&frame, false) {
            Some(TelemetrySample::Inertial(sample)) => sample,
            other => panic!("expected inertial sample, got {other:?}"),
        };

        // Floats must survive bit-for-bit
        assert_eq!(sample.angular_velocity_x.to_bits(), INERTIAL_VALUES[0].to_bits());
        assert_eq!(sample.angular_velocity_y.to_bits(), INERTIAL_VALUES[1].to_bits());
        assert_eq!(sample.angular_velocity_z.to_bits(), INERTIAL_VALUES[2].to_bits());
        assert_eq!(sample.acceleration_x.to_bits(), INERTIAL_VALUES[3].to_bits());
        assert_eq!(sample.acceleration_y.to_bits(), INERTIAL_VALUES[4].to_bits());
        assert_eq!(sample.acceleration_z.to_bits(), INERTIAL_VALUES[5].to_bits());
        assert_eq!(sample.magnetic_x.to_bits(), INERTIAL_VALUES[6].to_bits());
        assert_eq!(sample.magnetic_y.to_bits(), INERTIAL_VALUES[7].to_bits());
        assert_eq!(sample.magnetic_z.to_bits(), INERTIAL_VALUES[8].to_bits());
        assert_eq!(sample.imu_temperature.to_bits(), INERTIAL_VALUES[9].to_bits());
        assert_eq!(sample.pressure.to_bits(), INERTIAL_VALUES[10].to_bits());
        assert_eq!(sample.pressure_temperature.to_bits(), INERTIAL_VALUES[11].to_bits());
        assert_eq!(sample.timestamp, 0x0102_0304_0506_0708);
    }

    #[test]
    fn test_decode_valid_attitude_frame() {
        let values = [0.1f32, 0.2, 0.3, -12.5, 4.75, 180.0, 1.0, 0.0, 0.0, 0.0];
        let payload = attitude_payload(&values, 99);
        let frame = build_frame(TYPE_ATTITUDE, 0, &payload);

        let sample = match decode_frame(&frame, false) {
            Some(TelemetrySample::Attitude(sample)) => sample,
            other => panic!("expected attitude sample, got {other:?}"),
        };

        assert_eq!(sample.roll_rate.to_bits(), values[0].to_bits());
        assert_eq!(sample.heading.to_bits(), values[5].to_bits());
        assert_eq!(sample.q1.to_bits(), values[6].to_bits());
        assert_eq!(sample.q4.to_bits(), values[9].to_bits());
        assert_eq!(sample.timestamp, 99);
    }

    #[test]
    fn test_payload_bit_flip_fails_checksum() {
        let payload = inertial_payload(&INERTIAL_VALUES, 1);
        let mut frame = build_frame(TYPE_INERTIAL, 0, &payload);

        // Flip one bit in the middle of the payload
        frame[20] ^= 0x01;
        assert_eq!(decode_frame(&frame, false), None);
    }

    #[test]
    fn test_header_corruption_fails_checksum() {
        let payload = inertial_payload(&INERTIAL_VALUES, 1);
        let mut frame = build_frame(TYPE_INERTIAL, 5, &payload);

        // Corrupt the sequence number: the header CRC no longer matches
        frame[3] = frame[3].wrapping_add(1);
        assert_eq!(decode_frame(&frame, false), None);
    }

    #[test]
    fn test_lenient_mode_delivers_corrupt_payload() {
        let payload = inertial_payload(&INERTIAL_VALUES, 1);
        let mut frame = build_frame(TYPE_INERTIAL, 0, &payload);
        frame[20] ^= 0x01;

        // Legacy behavior: the checksum mismatch is logged but the frame
        // is still delivered
        assert!(decode_frame(&frame, true).is_some());
    }

    #[test]
    fn test_declared_length_must_match_type() {
        // Correct checksums, inertial type code, but a 50-byte payload
        let payload = vec![0x33u8; 50];
        let frame = build_frame(TYPE_INERTIAL, 0, &payload);
        assert_eq!(decode_frame(&frame, false), None);
    }

    #[test]
    fn test_length_field_must_match_frame_size() {
        let payload = inertial_payload(&INERTIAL_VALUES, 1);
        let mut frame = build_frame(TYPE_INERTIAL, 0, &payload);

        // Shorten the frame without touching the declared length; drop in
        // a fresh end byte so only the size check can reject it
        frame.truncate(frame.len() - 5);
        *frame.last_mut().unwrap() = FRAME_END;
        assert_eq!(decode_frame(&frame, false), None);
    }

    #[test]
    fn test_unknown_type_code_dropped() {
        let payload = vec![0x44u8; 16];
        let frame = build_frame(0x7E, 0, &payload);
        assert_eq!(decode_frame(&frame, false), None);
    }

    #[test]
    fn test_undersized_frame_dropped() {
        assert_eq!(decode_frame(&[FRAME_START, TYPE_INERTIAL, 0, 0, 0], false), None);
    }

    #[test]
    fn test_decode_inertial_rejects_wrong_length() {
        assert_eq!(decode_inertial(&[0u8; 55]), None);
        assert_eq!(decode_attitude(&[0u8; 49]), None);
    }
}
