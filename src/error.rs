//! # Error Types
//!
//! Custom error types for Telemetry Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for Telemetry Bridge
#[derive(Debug, Error)]
pub enum TelemetryBridgeError {
    /// Radio wire protocol errors (encoding side; decode failures are
    /// recovered in-stream and never surface as errors)
    #[error("radio protocol error: {0}")]
    RadioProtocol(String),

    /// Radio tuning handshake errors
    #[error("radio setup error: {0}")]
    RadioSetup(String),

    /// Serial port errors
    #[error("serial error: {0}")]
    Serial(String),

    /// No serial port could be opened
    #[error("serial port not found: {0}")]
    SerialPortNotFound(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// JSON envelope serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Telemetry Bridge
pub type Result<T> = std::result::Result<T, TelemetryBridgeError>;
