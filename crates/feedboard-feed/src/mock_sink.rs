//! In-memory sink for testing
//!
//! [`MemorySink`] records every frame and flush, and can be disconnected from
//! the outside through its [`MemorySinkHandle`] to simulate a peer going away.
//!
//! ```rust,ignore
//! use feedboard_feed::{FeedPublisher, FeedSubscription, MemorySink};
//!
//! let publisher = FeedPublisher::new("messages", 20);
//! let (sink, handle) = MemorySink::new();
//! let mut subscription = FeedSubscription::new("messages", publisher.log(), sink, interval);
//!
//! publisher.publish("hi");
//! subscription.tick().await;
//! assert_eq!(handle.payloads(), vec!["hi"]);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::SinkError;
use crate::sink::TransportSink;

#[derive(Debug, Default)]
struct Shared {
    frames: Mutex<Vec<Bytes>>,
    flushed: AtomicUsize,
    disconnected: AtomicBool,
}

/// Sink that records frames in memory
#[derive(Debug)]
pub struct MemorySink {
    shared: Arc<Shared>,
    unflushed: Vec<Bytes>,
}

/// Inspection and control handle for a [`MemorySink`]
#[derive(Debug, Clone)]
pub struct MemorySinkHandle {
    shared: Arc<Shared>,
}

impl MemorySink {
    /// Create a connected sink and its handle
    pub fn new() -> (Self, MemorySinkHandle) {
        let shared = Arc::new(Shared::default());
        (
            Self {
                shared: Arc::clone(&shared),
                unflushed: Vec::new(),
            },
            MemorySinkHandle { shared },
        )
    }
}

#[async_trait]
impl TransportSink for MemorySink {
    async fn write_frame(&mut self, frame: Bytes) -> Result<(), SinkError> {
        if self.shared.disconnected.load(Ordering::SeqCst) {
            return Err(SinkError::Disconnected);
        }
        self.unflushed.push(frame);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        if self.shared.disconnected.load(Ordering::SeqCst) {
            return Err(SinkError::Disconnected);
        }
        self.shared.frames.lock().append(&mut self.unflushed);
        self.shared.flushed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.shared.disconnected.load(Ordering::SeqCst)
    }
}

impl MemorySinkHandle {
    /// Simulate the peer going away
    pub fn disconnect(&self) {
        self.shared.disconnected.store(true, Ordering::SeqCst);
    }

    /// Flushed frames, as written
    pub fn frames(&self) -> Vec<Bytes> {
        self.shared.frames.lock().clone()
    }

    /// Flushed frames decoded back to their payload text
    pub fn payloads(&self) -> Vec<String> {
        self.frames()
            .iter()
            .map(|frame| {
                let text = String::from_utf8_lossy(frame);
                text.trim_end_matches('\n')
                    .split('\n')
                    .map(|line| line.strip_prefix("data: ").unwrap_or(line))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect()
    }

    /// Number of successful flushes
    pub fn flush_count(&self) -> usize {
        self.shared.flushed.load(Ordering::SeqCst)
    }
}
