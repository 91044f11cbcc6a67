//! # IMU Telemetry Decoding
//!
//! Everything between the IMU's serial byte stream and typed telemetry
//! samples: frame protocol constants, the two frame checksums, incremental
//! frame extraction, checked decoding, and the concurrent pipeline that
//! runs those stages over a live connection.

pub mod crc;
pub mod decoder;
pub mod extractor;
pub mod pipeline;
pub mod protocol;
