//! # Serial Communication Module
//!
//! Handles serial connections to the radio modem and the IMU.
//!
//! This module handles:
//! - Opening serial ports with 8N1 framing and no flow control
//! - Auto-detecting a device across a list of candidate paths
//! - Driving the radio modem's AT-style tuning handshake

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{sleep, timeout};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::error::{Result, TelemetryBridgeError};

/// Prompt the modem prints when it boots into setting mode
pub const SETUP_PROMPT: &str = "#1 UartConfig";

/// Acknowledgement the modem prints once the new settings are applied
pub const SETUP_DONE: &str = "#5 done";

/// Give up on either handshake phase after this long
const SETUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Settling delay between seeing the prompt and sending the command
const SETUP_COMMAND_DELAY: Duration = Duration::from_millis(500);

/// Open a serial port with the settings both attached devices use
///
/// 8 data bits, no parity, 1 stop bit, no flow control.
pub fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
    let port = tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| TelemetryBridgeError::Serial(format!("Failed to open {}: {}", path, e)))?;

    Ok(port)
}

/// Open the first device path that responds
///
/// Paths are tried in order; the opened stream is returned together with
/// the path that worked.
pub fn open_first(paths: &[String], baud_rate: u32) -> Result<(tokio_serial::SerialStream, String)> {
    for path in paths {
        debug!("Trying to open serial port: {}", path);

        match open_port(path, baud_rate) {
            Ok(port) => {
                info!("Successfully opened serial device at {}", path);
                return Ok((port, path.clone()));
            }
            Err(e) => {
                warn!("Failed to open {}: {}", path, e);
                continue;
            }
        }
    }

    Err(TelemetryBridgeError::SerialPortNotFound(paths.join(", ")))
}

/// Radio modem tuning parameters
///
/// The modem is tuned out of band: it is rebooted into setting mode at a
/// fixed setting baud rate, then accepts one AT-style command built from
/// the template. `{baud}` and `{channel}` placeholders in the template are
/// substituted before sending.
#[derive(Debug, Clone)]
pub struct RadioTuning {
    /// Command template, e.g. `"AT+B{baud}C{channel}"`
    pub command_template: String,
    /// Modem-specific code for the target air baud rate
    pub baud_code: String,
    /// RF channel number
    pub channel: u8,
}

impl RadioTuning {
    /// Render the setting command from the template
    pub fn command(&self) -> String {
        self.command_template
            .replace("{baud}", &self.baud_code)
            .replace("{channel}", &self.channel.to_string())
    }
}

/// Drive the modem's tuning handshake over an already-open setting-mode port
///
/// Waits for the setting-mode prompt, sends the rendered command after a
/// short settling delay, then waits for the modem's acknowledgement. Either
/// wait failing or timing out returns a `RadioSetup` error; the modem is
/// left in an unknown state in that case and should be power cycled.
pub async fn tune_radio<P>(port: &mut P, tuning: &RadioTuning) -> Result<()>
where
    P: AsyncRead + AsyncWrite + Unpin,
{
    info!("Start radio tuning");
    debug!("Waiting for setting mode...");
    wait_for_marker(port, SETUP_PROMPT).await?;

    // The modem drops bytes sent immediately after the prompt
    sleep(SETUP_COMMAND_DELAY).await;

    let command = tuning.command();
    port.write_all(command.as_bytes())
        .await
        .map_err(|e| TelemetryBridgeError::Serial(format!("Failed to send setting command: {}", e)))?;
    port.flush()
        .await
        .map_err(|e| TelemetryBridgeError::Serial(format!("Failed to flush setting command: {}", e)))?;
    debug!("Sent setting command: {}", command);

    wait_for_marker(port, SETUP_DONE).await?;
    info!(
        "Successfully tuned radio: rate=[{}], channel=[{}]",
        tuning.baud_code, tuning.channel
    );

    Ok(())
}

/// Accumulate modem output until it starts with `marker`, within the
/// handshake timeout
async fn wait_for_marker<P>(port: &mut P, marker: &str) -> Result<()>
where
    P: AsyncRead + Unpin,
{
    let wait = async {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 256];

        loop {
            let n = port.read(&mut chunk).await.map_err(|e| {
                TelemetryBridgeError::Serial(format!("Failed to read modem output: {}", e))
            })?;
            if n == 0 {
                return Err(TelemetryBridgeError::RadioSetup(format!(
                    "Modem closed the connection while waiting for '{}'",
                    marker
                )));
            }

            buffer.extend_from_slice(&chunk[..n]);
            if String::from_utf8_lossy(&buffer).starts_with(marker) {
                return Ok(());
            }
        }
    };

    match timeout(SETUP_TIMEOUT, wait).await {
        Ok(result) => result,
        Err(_) => Err(TelemetryBridgeError::RadioSetup(format!(
            "Timed out waiting for '{}'",
            marker
        ))),
    }
}
