//! # Telemetry Bridge Library
//!
//! Drone-side telemetry plumbing: decodes sensor frames from a
//! serial-attached IMU and exchanges framed messages with a ground station
//! over a lossy serial radio link.
//!
//! This library provides the escaped radio packet codec with loss
//! resynchronization, the IMU frame decoding pipeline, and the message
//! envelope layer that ties them together.

pub mod config;
pub mod error;
pub mod imu;
pub mod link;
pub mod radio;
pub mod serial;
