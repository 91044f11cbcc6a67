//! # Telemetry Bridge
//!
//! Drone-side telemetry daemon: decodes IMU sensor frames off one serial
//! port and forwards them as JSON messages over a serial radio link on
//! another, while receiving ground-station messages in the other
//! direction.

use anyhow::Result;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

use telemetry_bridge::config::Config;
use telemetry_bridge::imu::pipeline::{ImuPipeline, PipelineOptions};
use telemetry_bridge::link::{LinkPayload, RadioLink};
use telemetry_bridge::serial;

/// Fallback configuration path when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Seconds between status log messages
const STATS_INTERVAL_SECS: u64 = 10;

/// Main entry point for the Telemetry Bridge daemon
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load and validate configuration
///    - Optionally run the radio tuning handshake
///    - Open the IMU and radio serial ports
///    - Spawn the IMU decoding pipeline and the radio link
///
/// 2. **Main Loop**
///    - Forward every decoded IMU sample over the radio as JSON
///    - Log received ground-station messages
///    - Log throughput counters every 10 seconds
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Stop the pipeline and join its stages
///    - Close the radio link
///
/// # Errors
///
/// Returns error if the configuration is invalid, no serial port can be
/// opened, or the radio tuning handshake fails.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("Telemetry Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;
    info!("Loaded configuration from {}", config_path);

    // The modem reboots into setting mode at a dedicated baud rate, so
    // tuning happens on its own short-lived connection
    if config.radio.tune_on_startup {
        if let Some(tuning) = config.radio_tuning() {
            let (mut setting_port, _) = serial::open_first(
                &config.radio.device_paths,
                config.radio.setting_baud_rate,
            )?;
            serial::tune_radio(&mut setting_port, &tuning).await?;
        }
    }

    let (imu_port, imu_path) =
        serial::open_first(&config.imu.device_paths, config.imu.baud_rate)?;
    info!("IMU serial port opened at: {}", imu_path);

    let (radio_port, radio_path) =
        serial::open_first(&config.radio.device_paths, config.radio.baud_rate)?;
    info!("Radio serial port opened at: {}", radio_path);

    let options = PipelineOptions {
        lenient_checksums: config.imu.lenient_checksums,
    };
    let mut pipeline = ImuPipeline::spawn(imu_port, options);
    let mut samples = match pipeline.take_samples() {
        Some(samples) => samples,
        None => unreachable!("sample stream is present on a fresh pipeline"),
    };

    let (radio_read, radio_write) = tokio::io::split(radio_port);
    let (mut link, mut messages) = RadioLink::start(radio_read, radio_write);

    info!("Forwarding IMU telemetry over the radio link");
    info!("Press Ctrl+C to exit");

    let mut stats_interval = interval(Duration::from_secs(STATS_INTERVAL_SECS));
    let mut forwarded: u64 = 0;
    let mut received: u64 = 0;

    // Main loop
    loop {
        tokio::select! {
            sample = samples.recv() => {
                let Some(sample) = sample else {
                    warn!("IMU pipeline stopped, shutting down");
                    break;
                };

                let value = serde_json::to_value(sample)?;
                if let Err(e) = link.send_json(&value).await {
                    warn!("Failed to forward sample: {}", e);
                    continue;
                }
                forwarded += 1;
            }

            message = messages.recv() => {
                let Some(message) = message else {
                    warn!("Radio link closed, shutting down");
                    break;
                };

                received += 1;
                match message.payload {
                    LinkPayload::Json(value) => {
                        info!("Ground station message: {}", value);
                    }
                    LinkPayload::Short(body) => {
                        info!("Ground station short message ({} bytes)", body.len());
                    }
                }
            }

            _ = stats_interval.tick() => {
                info!("Forwarded {} samples, received {} messages", forwarded, received);
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    pipeline.shutdown().await;
    link.close().await;
    info!("Total samples forwarded: {}", forwarded);

    Ok(())
}
