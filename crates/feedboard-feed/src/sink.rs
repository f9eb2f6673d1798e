//! Transport sinks and event framing
//!
//! A subscription pushes framed events into a [`TransportSink`]. Frames use the
//! plain-text event-stream format: every payload line is prefixed with
//! `data: ` and the frame ends with a blank line.
//!
//! [`ChannelSink`] is the sink used for HTTP responses: frames are buffered
//! until [`flush`](TransportSink::flush), which hands the whole batch to the
//! response body through a channel. Dropping the response closes the channel,
//! which the subscription sees as a disconnect.

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use tokio::sync::mpsc;

use crate::error::SinkError;

/// Marker that starts every line of a frame
pub const DATA_PREFIX: &[u8] = b"data: ";

/// Write endpoint a subscription pushes frames into
#[async_trait]
pub trait TransportSink: Send {
    /// Queue one frame for delivery
    async fn write_frame(&mut self, frame: Bytes) -> Result<(), SinkError>;

    /// Push everything written so far to the peer
    async fn flush(&mut self) -> Result<(), SinkError>;

    /// True once the peer is known to be gone
    fn is_closed(&self) -> bool {
        false
    }
}

/// Frame a payload as one event-stream message
pub fn encode_frame(payload: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(payload.len() + DATA_PREFIX.len() + 2);
    for line in payload.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        frame.put_slice(DATA_PREFIX);
        frame.put_slice(line);
        frame.put_u8(b'\n');
    }
    frame.put_u8(b'\n');
    frame.freeze()
}

/// Sink that batches frames and delivers each flush as one channel message
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
    pending: BytesMut,
}

impl ChannelSink {
    /// Create a sink and the receiving end that feeds the response body
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            Self {
                tx,
                pending: BytesMut::new(),
            },
            rx,
        )
    }
}

#[async_trait]
impl TransportSink for ChannelSink {
    async fn write_frame(&mut self, frame: Bytes) -> Result<(), SinkError> {
        if self.tx.is_closed() {
            return Err(SinkError::Disconnected);
        }
        self.pending.put(frame);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let chunk = self.pending.split().freeze();
        self.tx
            .send(chunk)
            .await
            .map_err(|_| SinkError::Disconnected)
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
