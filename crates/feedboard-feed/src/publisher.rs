//! Single producer entry point for a feed

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::log::EventLog;

/// Owns a feed's [`EventLog`] and is the only path that mutates it.
///
/// Producers on many tasks may call [`publish`](Self::publish) through a shared
/// reference; appends serialize on the log's write lock.
#[derive(Debug)]
pub struct FeedPublisher {
    name: String,
    log: Arc<EventLog>,
}

impl FeedPublisher {
    /// Create a publisher with a fresh log retaining `capacity` events
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            log: Arc::new(EventLog::new(capacity)),
        }
    }

    /// Feed name, used in logs
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read handle for subscriptions
    pub fn log(&self) -> Arc<EventLog> {
        Arc::clone(&self.log)
    }

    /// Append an event to the feed.
    ///
    /// Empty payloads are dropped. Returns the assigned sequence, or `None` if
    /// nothing was appended (empty payload or finished feed).
    pub fn publish(&self, payload: impl Into<Bytes>) -> Option<u64> {
        let payload = payload.into();
        if payload.is_empty() {
            trace!(feed = %self.name, "Dropping empty event");
            return None;
        }

        let sequence = self.log.append(payload)?;
        debug!(feed = %self.name, sequence, "Published event");
        Some(sequence)
    }

    /// End the feed. Subscriptions complete once they have drained it.
    pub fn finish(&self) {
        self.log.close();
        debug!(feed = %self.name, total = self.log.total_appended(), "Feed finished");
    }

    /// Whether [`finish`](Self::finish) has been called
    pub fn is_finished(&self) -> bool {
        self.log.is_closed()
    }
}
