//! # IMU Frame Protocol Constants and Types
//!
//! Fixed-layout sensor frame format of the serial-attached IMU, all
//! multi-byte fields little-endian:
//!
//! ```text
//! [0]        start byte (0xFC)
//! [1]        type code: 0x40 inertial (56B payload), 0x41 attitude (48B)
//! [2]        declared payload length
//! [3]        sequence number
//! [4]        CRC-8 over bytes [0..=3]
//! [5..=6]    CRC-16 over the payload, little-endian
//! [7..7+len) payload
//! [7+len]    end byte (0xFD)
//! ```

use serde::Serialize;

/// Frame start byte
pub const FRAME_START: u8 = 0xFC;

/// Frame end byte
pub const FRAME_END: u8 = 0xFD;

/// Type code of an inertial (raw IMU) frame
pub const TYPE_INERTIAL: u8 = 0x40;

/// Fixed payload length of an inertial frame
pub const INERTIAL_PAYLOAD_LEN: usize = 56;

/// Type code of an attitude (AHRS) frame
pub const TYPE_ATTITUDE: u8 = 0x41;

/// Fixed payload length of an attitude frame
pub const ATTITUDE_PAYLOAD_LEN: usize = 48;

/// Minimum frame size: 7-byte header + end byte + empty payload
pub const MIN_FRAME_SIZE: usize = 9;

/// Frame overhead: everything except the payload (start, type, length,
/// sequence, CRC-8, CRC-16, end)
pub const FRAME_OVERHEAD: usize = 8;

/// Accumulator cap: the largest well-formed frame is an inertial frame
/// (64 bytes), so a buffer well past that without an end byte means the
/// link is stuck or noisy and the oldest bytes can be shed
pub const MAX_ACCUMULATOR_SIZE: usize = 263;

/// Raw inertial measurement decoded from a 56-byte payload
///
/// 12 little-endian f32 fields followed by a 64-bit monotonic timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InertialSample {
    /// Angular velocity, X axis (deg/s)
    pub angular_velocity_x: f32,
    /// Angular velocity, Y axis (deg/s)
    pub angular_velocity_y: f32,
    /// Angular velocity, Z axis (deg/s)
    pub angular_velocity_z: f32,

    /// Acceleration, X axis (m/s²)
    pub acceleration_x: f32,
    /// Acceleration, Y axis (m/s²)
    pub acceleration_y: f32,
    /// Acceleration, Z axis (m/s²)
    pub acceleration_z: f32,

    /// Magnetic field, X axis (µT)
    pub magnetic_x: f32,
    /// Magnetic field, Y axis (µT)
    pub magnetic_y: f32,
    /// Magnetic field, Z axis (µT)
    pub magnetic_z: f32,

    /// IMU die temperature (°C)
    pub imu_temperature: f32,
    /// Barometric pressure (Pa)
    pub pressure: f32,
    /// Pressure sensor temperature (°C)
    pub pressure_temperature: f32,

    /// Monotonic device timestamp
    pub timestamp: u64,
}

/// Fused attitude (AHRS) output decoded from a 48-byte payload
///
/// 10 little-endian f32 fields followed by a 64-bit monotonic timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttitudeSample {
    /// Roll rate (deg/s)
    pub roll_rate: f32,
    /// Pitch rate (deg/s)
    pub pitch_rate: f32,
    /// Heading rate (deg/s)
    pub heading_rate: f32,

    /// Roll angle (deg)
    pub roll: f32,
    /// Pitch angle (deg)
    pub pitch: f32,
    /// Heading angle (deg)
    pub heading: f32,

    /// Attitude quaternion, component 1
    pub q1: f32,
    /// Attitude quaternion, component 2
    pub q2: f32,
    /// Attitude quaternion, component 3
    pub q3: f32,
    /// Attitude quaternion, component 4
    pub q4: f32,

    /// Monotonic device timestamp
    pub timestamp: u64,
}

/// A validated, typed sample coming off the decode stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetrySample {
    Inertial(InertialSample),
    Attitude(AttitudeSample),
}

impl TelemetrySample {
    /// Device timestamp of the sample, regardless of type
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::Inertial(sample) => sample.timestamp,
            Self::Attitude(sample) => sample.timestamp,
        }
    }
}
