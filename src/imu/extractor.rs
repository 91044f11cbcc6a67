//! # Sensor Frame Extractor
//!
//! Scans the raw IMU serial stream for start/end delimited candidate
//! frames. This link uses no escaping: an end byte appearing inside payload
//! data cuts the frame short, and the resulting candidate is rejected later
//! by its checksums. Alignment recovers on the next start byte.

use bytes::BytesMut;
use tracing::trace;

use super::protocol::{FRAME_END, FRAME_START, MAX_ACCUMULATOR_SIZE, MIN_FRAME_SIZE};

/// Incremental frame extractor for one IMU connection
///
/// Owns its accumulator exclusively. Memory use is bounded by
/// [`MAX_ACCUMULATOR_SIZE`]: a stuck or noisy link that never produces an
/// end byte sheds its oldest byte and re-aligns instead of growing forever.
#[derive(Debug, Default)]
pub struct FrameExtractor {
    accumulator: BytesMut,
}

impl FrameExtractor {
    /// Create an extractor with an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes currently accumulated
    pub fn buffered(&self) -> usize {
        self.accumulator.len()
    }

    /// Feed received bytes and cut out every candidate frame available
    ///
    /// Candidates run from a start byte through the next end byte inclusive
    /// and are at least [`MIN_FRAME_SIZE`] bytes; shorter delimited runs are
    /// dropped silently. Returned frames still carry unverified checksums.
    pub fn push(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        self.accumulator.extend_from_slice(data);

        let mut frames = Vec::new();
        loop {
            self.align_to_start();

            match self.accumulator.iter().position(|&b| b == FRAME_END) {
                Some(end) => {
                    let candidate = self.accumulator.split_to(end + 1);
                    if candidate.len() >= MIN_FRAME_SIZE {
                        frames.push(candidate.to_vec());
                    } else {
                        trace!(len = candidate.len(), "dropping undersized frame candidate");
                    }
                }
                None => {
                    if self.accumulator.len() > MAX_ACCUMULATOR_SIZE {
                        // No end byte within the cap: shed the oldest byte
                        // and re-align on the next start byte
                        trace!("accumulator cap exceeded, shedding oldest byte");
                        let _ = self.accumulator.split_to(1);
                        continue;
                    }
                    break;
                }
            }
        }

        frames
    }

    /// Discard leading bytes up to the first start byte
    fn align_to_start(&mut self) {
        if self.accumulator.first() == Some(&FRAME_START) {
            return;
        }

        match self.accumulator.iter().position(|&b| b == FRAME_START) {
            Some(offset) => {
                let _ = self.accumulator.split_to(offset);
            }
            None => self.accumulator.clear(),
        }
    }
}
