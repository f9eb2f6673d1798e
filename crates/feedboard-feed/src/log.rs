//! Bounded append-only event log
//!
//! Each feed keeps its history in an [`EventLog`]: a sliding window over the
//! most recent `capacity` events. Sequence numbers are assigned at append time,
//! start at 1, and never repeat. When the window slides, the logical start of
//! the log advances with it.
//!
//! Readers hold a private [`Cursor`] and ask for everything after it with
//! [`EventLog::events_since`]. Reading never consumes anything, so any number
//! of subscribers can replay the same history at their own pace.

use std::borrow::Cow;
use std::collections::VecDeque;

use bytes::Bytes;
use parking_lot::RwLock;

/// A single event retained by a log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Sequence number assigned at append (1-based)
    pub sequence: u64,
    /// Opaque payload
    pub payload: Bytes,
    /// Timestamp when the event was appended
    pub timestamp_millis: i64,
}

impl Event {
    fn new(sequence: u64, payload: Bytes) -> Self {
        Self {
            sequence,
            payload,
            timestamp_millis: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Payload as text, replacing invalid UTF-8
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// A subscriber's private position in a log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    last_delivered: Option<u64>,
}

impl Cursor {
    /// Cursor that has delivered nothing yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor positioned after `sequence`
    pub fn at(sequence: u64) -> Self {
        Self {
            last_delivered: Some(sequence),
        }
    }

    /// Last delivered sequence number, if any
    pub fn last_delivered(&self) -> Option<u64> {
        self.last_delivered
    }

    /// Move past the events of `batch`. Never moves backwards.
    pub fn advance(&mut self, batch: &EventBatch) {
        if let Some(last) = batch.last_sequence {
            self.last_delivered = Some(self.last_delivered.map_or(last, |current| current.max(last)));
        }
    }

    fn next_wanted(&self) -> u64 {
        self.last_delivered.map_or(1, |last| last + 1)
    }
}

/// Result of [`EventLog::events_since`]
#[derive(Debug, Clone, Default)]
pub struct EventBatch {
    /// Newly visible events in append order
    pub events: Vec<Event>,
    /// Sequence of the last event in `events`
    pub last_sequence: Option<u64>,
    /// Events the cursor missed because the window slid past it
    pub skipped: u64,
    /// Whether the log was closed when this batch was read
    pub finished: bool,
}

impl EventBatch {
    /// Number of events in the batch
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when the cursor was already caught up
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// True when the cursor had to jump forward over dropped events
    pub fn resynced(&self) -> bool {
        self.skipped > 0
    }
}

#[derive(Debug)]
struct Window {
    events: VecDeque<Event>,
    next_sequence: u64,
    closed: bool,
}

impl Window {
    fn first_sequence(&self) -> u64 {
        self.events
            .front()
            .map_or(self.next_sequence, |event| event.sequence)
    }
}

/// Bounded, append-only event log for one feed
///
/// Appends go through a write lock held only for the push and truncation.
/// Reads take the shared lock, so readers never block each other and never see
/// a half-applied append.
#[derive(Debug)]
pub struct EventLog {
    capacity: usize,
    window: RwLock<Window>,
}

impl EventLog {
    /// Create an empty log retaining at most `capacity` events (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            window: RwLock::new(Window {
                events: VecDeque::with_capacity(capacity),
                next_sequence: 1,
                closed: false,
            }),
        }
    }

    /// Append an event, dropping the oldest ones beyond capacity.
    ///
    /// Returns the assigned sequence, or `None` once the log is closed.
    pub(crate) fn append(&self, payload: Bytes) -> Option<u64> {
        let mut window = self.window.write();
        if window.closed {
            return None;
        }

        let sequence = window.next_sequence;
        window.next_sequence += 1;
        window.events.push_back(Event::new(sequence, payload));
        while window.events.len() > self.capacity {
            window.events.pop_front();
        }

        Some(sequence)
    }

    /// Mark the log finished; later appends are ignored
    pub(crate) fn close(&self) {
        self.window.write().closed = true;
    }

    /// All retained events after `cursor`, in append order.
    ///
    /// A cursor older than the retained window gets every retained event and
    /// the batch reports how many it skipped.
    pub fn events_since(&self, cursor: &Cursor) -> EventBatch {
        let window = self.window.read();
        let first = window.first_sequence();
        let wanted = cursor.next_wanted();

        let skipped = match cursor.last_delivered() {
            Some(_) if wanted < first => first - wanted,
            _ => 0,
        };

        let start = wanted.max(first);
        if start >= window.next_sequence {
            return EventBatch {
                skipped,
                finished: window.closed,
                ..EventBatch::default()
            };
        }

        let offset = (start - first) as usize;
        let events: Vec<Event> = window.events.iter().skip(offset).cloned().collect();
        let last_sequence = events.last().map(|event| event.sequence);

        EventBatch {
            events,
            last_sequence,
            skipped,
            finished: window.closed,
        }
    }

    /// Maximum number of retained events
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retained events
    pub fn len(&self) -> usize {
        self.window.read().events.len()
    }

    /// True if nothing is retained
    pub fn is_empty(&self) -> bool {
        self.window.read().events.is_empty()
    }

    /// Sequence of the oldest retained event
    pub fn first_sequence(&self) -> Option<u64> {
        self.window.read().events.front().map(|event| event.sequence)
    }

    /// Sequence of the newest retained event
    pub fn last_sequence(&self) -> Option<u64> {
        self.window.read().events.back().map(|event| event.sequence)
    }

    /// Total events ever appended
    pub fn total_appended(&self) -> u64 {
        self.window.read().next_sequence - 1
    }

    /// Whether the log has been closed
    pub fn is_closed(&self) -> bool {
        self.window.read().closed
    }
}
