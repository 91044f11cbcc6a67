//! # Radio Link Messaging
//!
//! Message envelopes over the escaped radio packet layer. Each radio
//! packet carries one message: a 5-byte ASCII prefix tag followed by the
//! body. `JSON-` tags a JSON document, `SHORT` tags a small raw-byte
//! message that skips JSON overhead.
//!
//! Sending encodes the enveloped message into radio packets and writes
//! them out; a receive task feeds incoming bytes through the deframer and
//! publishes classified, receive-timestamped messages on a channel.
//! Messages larger than one radio packet fragment on the wire and arrive
//! as separate (unparseable) pieces, so senders keep JSON documents under
//! the packet payload limit.

use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Result, TelemetryBridgeError};
use crate::radio::deframer::{DecodeOutcome, Deframer};
use crate::radio::encoder;

/// Envelope tag for JSON messages
pub const JSON_PREFIX: &[u8; 5] = b"JSON-";

/// Envelope tag for short raw-byte messages
pub const SHORT_PREFIX: &[u8; 5] = b"SHORT";

/// Decoded link message body
#[derive(Debug, Clone, PartialEq)]
pub enum LinkPayload {
    Json(serde_json::Value),
    Short(Vec<u8>),
}

/// A received link message with its local arrival time
#[derive(Debug, Clone)]
pub struct LinkMessage {
    pub payload: LinkPayload,
    pub received_at: DateTime<Utc>,
}

/// Bidirectional message link over a radio serial connection
///
/// Owns the write half; the read half is consumed by a background task
/// that runs until the connection closes or the link is shut down.
pub struct RadioLink<W> {
    writer: W,
    receive_task: JoinHandle<()>,
}

impl<W> RadioLink<W>
where
    W: AsyncWrite + Unpin,
{
    /// Start a link over a split connection
    ///
    /// Returns the link handle and the stream of received messages. The
    /// message stream ends when the remote side closes or the link is
    /// shut down.
    pub fn start<R>(reader: R, writer: W) -> (Self, mpsc::UnboundedReceiver<LinkMessage>)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let receive_task = tokio::spawn(receive_loop(reader, message_tx));

        (
            Self {
                writer,
                receive_task,
            },
            message_rx,
        )
    }

    /// Send a JSON message
    pub async fn send_json(&mut self, value: &serde_json::Value) -> Result<()> {
        let body = serde_json::to_vec(value)?;
        let mut message = Vec::with_capacity(JSON_PREFIX.len() + body.len());
        message.extend_from_slice(JSON_PREFIX);
        message.extend_from_slice(&body);
        self.send_raw(&message).await
    }

    /// Send a short raw-byte message
    pub async fn send_short(&mut self, body: &[u8]) -> Result<()> {
        let mut message = Vec::with_capacity(SHORT_PREFIX.len() + body.len());
        message.extend_from_slice(SHORT_PREFIX);
        message.extend_from_slice(body);
        self.send_raw(&message).await
    }

    /// Encode an enveloped message and write every packet of it
    async fn send_raw(&mut self, message: &[u8]) -> Result<()> {
        for packet in encoder::encode(message)? {
            self.writer.write_all(&packet.bytes).await.map_err(|e| {
                TelemetryBridgeError::Serial(format!("Failed to write radio packet: {}", e))
            })?;
        }
        self.writer.flush().await.map_err(|e| {
            TelemetryBridgeError::Serial(format!("Failed to flush radio port: {}", e))
        })?;

        debug!("Sent radio message ({} bytes)", message.len());
        Ok(())
    }

    /// Stop the receive task and release the connection
    pub async fn close(self) {
        self.receive_task.abort();
        let _ = self.receive_task.await;
    }
}

/// Read incoming bytes, deframe them, and publish classified messages
async fn receive_loop<R>(mut reader: R, message_tx: mpsc::UnboundedSender<LinkMessage>)
where
    R: AsyncRead + Unpin,
{
    let mut deframer = Deframer::new();
    let mut buf = [0u8; 1024];

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                debug!("radio link: reader closed");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                warn!("radio link: read failed: {e}");
                break;
            }
        };

        match deframer.decode(&buf[..n]) {
            DecodeOutcome::Packets(packets) => {
                for packet in packets {
                    let Some(payload) = classify(packet) else {
                        continue;
                    };
                    let message = LinkMessage {
                        payload,
                        received_at: Utc::now(),
                    };
                    if message_tx.send(message).is_err() {
                        return;
                    }
                }
            }
            DecodeOutcome::Resynced => {
                warn!("radio link: resynchronized after data loss");
            }
            DecodeOutcome::NeedMoreData => {}
        }
    }
}

/// Classify a deframed packet by its envelope tag
///
/// Packets without a known tag, and JSON bodies that fail to parse, are
/// dropped with a warning. Both come from fragmented or foreign traffic
/// and carry nothing recoverable.
fn classify(packet: Vec<u8>) -> Option<LinkPayload> {
    if packet.len() < JSON_PREFIX.len() {
        warn!("radio link: dropping {}-byte runt message", packet.len());
        return None;
    }

    let (tag, body) = packet.split_at(JSON_PREFIX.len());
    if tag == SHORT_PREFIX {
        return Some(LinkPayload::Short(body.to_vec()));
    }
    if tag == JSON_PREFIX {
        return match serde_json::from_slice(body) {
            Ok(value) => Some(LinkPayload::Json(value)),
            Err(e) => {
                warn!("radio link: dropping unparseable JSON message: {e}");
                None
            }
        };
    }

    warn!("radio link: dropping message with unknown tag");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::duplex;

    /// Two links facing each other over an in-memory pipe
    fn linked_pair() -> (
        RadioLink<tokio::io::WriteHalf<tokio::io::DuplexStream>>,
        mpsc::UnboundedReceiver<LinkMessage>,
        RadioLink<tokio::io::WriteHalf<tokio::io::DuplexStream>>,
        mpsc::UnboundedReceiver<LinkMessage>,
    ) {
        let (near, far) = duplex(64 * 1024);
        let (near_read, near_write) = tokio::io::split(near);
        let (far_read, far_write) = tokio::io::split(far);
        let (near_link, near_rx) = RadioLink::start(near_read, near_write);
        let (far_link, far_rx) = RadioLink::start(far_read, far_write);
        (near_link, near_rx, far_link, far_rx)
    }

    #[tokio::test]
    async fn test_json_message_roundtrip() {
        let (mut near, _near_rx, far, mut far_rx) = linked_pair();

        let value = json!({"battery": 11.7, "armed": false});
        near.send_json(&value).await.unwrap();

        let message = far_rx.recv().await.unwrap();
        assert_eq!(message.payload, LinkPayload::Json(value));

        near.close().await;
        far.close().await;
    }

    #[tokio::test]
    async fn test_short_message_roundtrip() {
        let (mut near, _near_rx, far, mut far_rx) = linked_pair();

        near.send_short(b"ACK").await.unwrap();

        let message = far_rx.recv().await.unwrap();
        assert_eq!(message.payload, LinkPayload::Short(b"ACK".to_vec()));

        near.close().await;
        far.close().await;
    }

    #[tokio::test]
    async fn test_messages_arrive_in_order() {
        let (mut near, _near_rx, far, mut far_rx) = linked_pair();

        for i in 0..10 {
            near.send_json(&json!({"seq": i})).await.unwrap();
        }

        for i in 0..10 {
            let message = far_rx.recv().await.unwrap();
            assert_eq!(message.payload, LinkPayload::Json(json!({"seq": i})));
        }

        near.close().await;
        far.close().await;
    }

    #[tokio::test]
    async fn test_payload_with_marker_bytes_survives() {
        let (mut near, _near_rx, far, mut far_rx) = linked_pair();

        // 0x5C is the radio packet marker; the escape layer must hide it
        let body = vec![0x5C, 0x5C, 0x00, 0x5C, 0xFF];
        near.send_short(&body).await.unwrap();

        let message = far_rx.recv().await.unwrap();
        assert_eq!(message.payload, LinkPayload::Short(body));

        near.close().await;
        far.close().await;
    }

    #[tokio::test]
    async fn test_receive_stream_ends_when_remote_closes() {
        let (near, _near_rx, _far, mut far_rx) = linked_pair();

        // Closing the near link drops both halves of its connection; the
        // far side's reader hits EOF and its message stream ends
        near.close().await;
        assert!(far_rx.recv().await.is_none());
    }

    #[test]
    fn test_classify_short() {
        let packet = b"SHORTdata".to_vec();
        assert_eq!(
            classify(packet),
            Some(LinkPayload::Short(b"data".to_vec()))
        );
    }

    #[test]
    fn test_classify_json() {
        let packet = b"JSON-{\"a\":1}".to_vec();
        assert_eq!(classify(packet), Some(LinkPayload::Json(json!({"a": 1}))));
    }

    #[test]
    fn test_classify_rejects_unknown_tag() {
        assert_eq!(classify(b"WHAT?payload".to_vec()), None);
    }

    #[test]
    fn test_classify_rejects_runt() {
        assert_eq!(classify(b"JS".to_vec()), None);
    }

    #[test]
    fn test_classify_rejects_bad_json() {
        assert_eq!(classify(b"JSON-{not json".to_vec()), None);
    }
}
