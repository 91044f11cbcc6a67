//! # IMU Decoding Pipeline
//!
//! Four concurrent stages, one task each, connected by unbounded mpsc
//! channels carrying owned, immutable messages:
//!
//! ```text
//! serial reader -> raw chunks -> frame extraction -> decode/validate -> publish
//! ```
//!
//! Stages block on `recv().await` instead of polling, so an idle pipeline
//! consumes nothing. The only cross-task state is the channels themselves;
//! ownership of every message transfers fully to the consumer. Shutdown is
//! signalled once, each stage exits after finishing its current item, and
//! [`ImuPipeline::shutdown`] joins all four tasks.
//!
//! Decoded samples are published two ways: a latest-sample `watch` slot per
//! type (readers that only want the current state never queue), and a
//! single typed-sample stream for a consumer that wants every sample in
//! arrival order.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::decoder::decode_frame;
use super::extractor::FrameExtractor;
use super::protocol::{AttitudeSample, InertialSample, TelemetrySample};

/// Serial read buffer size per intake iteration
const READ_BUF_SIZE: usize = 512;

/// Pipeline tuning knobs
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Log checksum mismatches instead of dropping the frame
    pub lenient_checksums: bool,
}

/// Handle to a running IMU decoding pipeline
///
/// One pipeline per IMU connection; on reconnect, shut it down and spawn a
/// fresh one over the new reader.
pub struct ImuPipeline {
    samples: Option<mpsc::UnboundedReceiver<TelemetrySample>>,
    latest_inertial: watch::Receiver<Option<InertialSample>>,
    latest_attitude: watch::Receiver<Option<AttitudeSample>>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ImuPipeline {
    /// Spawn all four stages over `reader`
    ///
    /// The intake stage owns the reader and runs until EOF, a read error,
    /// or shutdown; the downstream stages drain and exit as their input
    /// channels close behind it.
    pub fn spawn<R>(reader: R, options: PipelineOptions) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let (sample_tx, sample_rx) = mpsc::unbounded_channel::<TelemetrySample>();
        let (out_tx, out_rx) = mpsc::unbounded_channel::<TelemetrySample>();
        let (latest_inertial_tx, latest_inertial_rx) = watch::channel(None);
        let (latest_attitude_tx, latest_attitude_rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tasks = vec![
            tokio::spawn(intake_stage(reader, raw_tx, shutdown_rx)),
            tokio::spawn(extract_stage(raw_rx, frame_tx)),
            tokio::spawn(decode_stage(frame_rx, sample_tx, options)),
            tokio::spawn(publish_stage(
                sample_rx,
                out_tx,
                latest_inertial_tx,
                latest_attitude_tx,
            )),
        ];

        Self {
            samples: Some(out_rx),
            latest_inertial: latest_inertial_rx,
            latest_attitude: latest_attitude_rx,
            shutdown: shutdown_tx,
            tasks,
        }
    }

    /// Take the typed-sample stream; yields every decoded sample in wire
    /// arrival order. Can be taken once.
    pub fn take_samples(&mut self) -> Option<mpsc::UnboundedReceiver<TelemetrySample>> {
        self.samples.take()
    }

    /// Watch slot holding the most recent inertial sample
    pub fn latest_inertial(&self) -> watch::Receiver<Option<InertialSample>> {
        self.latest_inertial.clone()
    }

    /// Watch slot holding the most recent attitude sample
    pub fn latest_attitude(&self) -> watch::Receiver<Option<AttitudeSample>> {
        self.latest_attitude.clone()
    }

    /// Signal every stage to stop and wait for all of them to finish
    ///
    /// In-flight items are processed to completion; no stage is interrupted
    /// mid-decode.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("pipeline task panicked during shutdown: {e}");
            }
        }
        info!("IMU pipeline shut down");
    }
}

/// Stage 1: read raw bytes off the serial port
async fn intake_stage<R>(
    mut reader: R,
    raw_tx: mpsc::UnboundedSender<Vec<u8>>,
    mut shutdown: watch::Receiver<bool>,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                debug!("intake stage: shutdown requested");
                break;
            }
            result = reader.read(&mut buf) => match result {
                Ok(0) => {
                    debug!("intake stage: reader closed");
                    break;
                }
                Ok(n) => {
                    if raw_tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("intake stage: read failed: {e}");
                    break;
                }
            },
        }
    }
}

/// Stage 2: cut candidate frames out of the raw byte stream
async fn extract_stage(
    mut raw_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    frame_tx: mpsc::UnboundedSender<Vec<u8>>,
) {
    let mut extractor = FrameExtractor::new();

    while let Some(chunk) = raw_rx.recv().await {
        for frame in extractor.push(&chunk) {
            if frame_tx.send(frame).is_err() {
                return;
            }
        }
    }
}

/// Stage 3: validate checksums and decode typed samples
async fn decode_stage(
    mut frame_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    sample_tx: mpsc::UnboundedSender<TelemetrySample>,
    options: PipelineOptions,
) {
    let mut decoded: u64 = 0;
    let mut dropped: u64 = 0;

    while let Some(frame) = frame_rx.recv().await {
        match decode_frame(&frame, options.lenient_checksums) {
            Some(sample) => {
                decoded += 1;
                if sample_tx.send(sample).is_err() {
                    break;
                }
            }
            None => dropped += 1,
        }
    }

    debug!(decoded, dropped, "decode stage finished");
}

/// Stage 4: fan decoded samples out to the latest-sample slots and the
/// ordered output stream
async fn publish_stage(
    mut sample_rx: mpsc::UnboundedReceiver<TelemetrySample>,
    out_tx: mpsc::UnboundedSender<TelemetrySample>,
    latest_inertial: watch::Sender<Option<InertialSample>>,
    latest_attitude: watch::Sender<Option<AttitudeSample>>,
) {
    while let Some(sample) = sample_rx.recv().await {
        match sample {
            TelemetrySample::Inertial(inertial) => {
                latest_inertial.send_replace(Some(inertial));
            }
            TelemetrySample::Attitude(attitude) => {
                latest_attitude.send_replace(Some(attitude));
            }
        }

        // The stream consumer is optional; the latest slots keep updating
        // even after it hangs up
        let _ = out_tx.send(sample);
    }
}
