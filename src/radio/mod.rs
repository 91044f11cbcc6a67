//! # Radio Wire Protocol Module
//!
//! Implementation of the escape-stuffed packet protocol used on the
//! half-duplex radio link between drone and ground station.
//!
//! This module handles:
//! - Escape-byte stuffing and unstuffing
//! - Packet encoding (length-prefixed, ≤3072 raw bytes per packet)
//! - Incremental stream deframing across arbitrary chunk boundaries
//! - Resynchronization after dropped or torn packets

pub mod protocol;
pub mod escape;
pub mod encoder;
pub mod deframer;
