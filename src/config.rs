//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::de::Error;
use serde::Deserialize;

use crate::error::Result;
use crate::serial::RadioTuning;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub radio: RadioConfig,
    pub imu: ImuConfig,
}

/// Radio modem configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RadioConfig {
    /// Device paths to try, in order of preference
    #[serde(default = "default_radio_device_paths")]
    pub device_paths: Vec<String>,

    /// Baud rate for normal operation
    #[serde(default = "default_radio_baud_rate")]
    pub baud_rate: u32,

    /// Baud rate the modem listens at in setting mode
    #[serde(default = "default_setting_baud_rate")]
    pub setting_baud_rate: u32,

    /// RF channel number
    #[serde(default = "default_channel")]
    pub channel: u8,

    /// Run the tuning handshake before opening the data link
    #[serde(default)]
    pub tune_on_startup: bool,

    /// Setting command template; `{baud}` and `{channel}` are substituted
    #[serde(default = "default_command_template")]
    pub command_template: String,

    /// Modem code for each supported baud rate
    #[serde(default = "default_baud_codes")]
    pub baud_codes: HashMap<String, String>,
}

/// IMU serial configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ImuConfig {
    /// Device paths to try, in order of preference
    #[serde(default = "default_imu_device_paths")]
    pub device_paths: Vec<String>,

    #[serde(default = "default_imu_baud_rate")]
    pub baud_rate: u32,

    /// Log checksum mismatches instead of dropping the frame
    #[serde(default)]
    pub lenient_checksums: bool,
}

// Default value functions
fn default_radio_device_paths() -> Vec<String> {
    vec!["/dev/ttyUSB0".to_string(), "/dev/ttyUSB1".to_string()]
}
fn default_radio_baud_rate() -> u32 { 57600 }
fn default_setting_baud_rate() -> u32 { 9600 }
fn default_channel() -> u8 { 21 }
fn default_command_template() -> String { "AT+B{baud}C{channel}".to_string() }

fn default_baud_codes() -> HashMap<String, String> {
    [
        ("1200", "1"),
        ("2400", "2"),
        ("4800", "3"),
        ("9600", "4"),
        ("19200", "5"),
        ("38400", "6"),
        ("57600", "7"),
        ("115200", "8"),
    ]
    .iter()
    .map(|(baud, code)| (baud.to_string(), code.to_string()))
    .collect()
}

fn default_imu_device_paths() -> Vec<String> {
    vec!["/dev/ttyACM0".to_string(), "/dev/ttyACM1".to_string()]
}
fn default_imu_baud_rate() -> u32 { 230400 }

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Tuning parameters derived from the radio section
    ///
    /// Only valid after `validate()`, which guarantees the baud code lookup
    /// succeeds.
    pub fn radio_tuning(&self) -> Option<RadioTuning> {
        let baud_code = self.radio.baud_codes.get(&self.radio.baud_rate.to_string())?;
        Some(RadioTuning {
            command_template: self.radio.command_template.clone(),
            baud_code: baud_code.clone(),
            channel: self.radio.channel,
        })
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.radio.device_paths.is_empty() {
            return Err(crate::error::TelemetryBridgeError::Config(
                toml::de::Error::custom("radio device_paths cannot be empty")
            ));
        }

        if self.imu.device_paths.is_empty() {
            return Err(crate::error::TelemetryBridgeError::Config(
                toml::de::Error::custom("imu device_paths cannot be empty")
            ));
        }

        // The modem only accepts channels 1-127
        if self.radio.channel == 0 || self.radio.channel > 127 {
            return Err(crate::error::TelemetryBridgeError::Config(
                toml::de::Error::custom("radio channel must be between 1 and 127")
            ));
        }

        if !self.radio.baud_codes.contains_key(&self.radio.baud_rate.to_string()) {
            return Err(crate::error::TelemetryBridgeError::Config(
                toml::de::Error::custom(format!(
                    "radio baud_rate {} has no entry in baud_codes",
                    self.radio.baud_rate
                ))
            ));
        }

        if self.radio.setting_baud_rate == 0 {
            return Err(crate::error::TelemetryBridgeError::Config(
                toml::de::Error::custom("radio setting_baud_rate must be greater than 0")
            ));
        }

        if !self.radio.command_template.contains("{baud}")
            || !self.radio.command_template.contains("{channel}")
        {
            return Err(crate::error::TelemetryBridgeError::Config(
                toml::de::Error::custom(
                    "radio command_template must contain {baud} and {channel} placeholders"
                )
            ));
        }

        if self.imu.baud_rate == 0 {
            return Err(crate::error::TelemetryBridgeError::Config(
                toml::de::Error::custom("imu baud_rate must be greater than 0")
            ));
        }

        Ok(())
    }
}
