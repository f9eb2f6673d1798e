//! Per-subscriber delivery loop
//!
//! A [`FeedSubscription`] owns one cursor into one log and one transport sink.
//! Every tick it reads what is new, frames it, writes it, flushes, and sleeps
//! for the poll interval. Bursts of appends between two ticks are delivered as
//! a single flushed batch.
//!
//! ```text
//! Attached ──run()──▶ Streaming ──sink failure / cancel──▶ Disconnected
//!                         │
//!                         └──log finished and drained──▶ Completed
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error::SinkError;
use crate::log::{Cursor, EventLog};
use crate::sink::{TransportSink, encode_frame};

/// Lifecycle state of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Created, nothing polled yet
    Attached,
    /// Polling and delivering
    Streaming,
    /// Peer gone or cancelled (terminal)
    Disconnected,
    /// Finite feed fully delivered (terminal)
    Completed,
}

impl SubscriptionState {
    /// True for states the loop never leaves
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected | Self::Completed)
    }
}

/// Summary returned when a subscription ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionOutcome {
    /// Terminal state
    pub state: SubscriptionState,
    /// Events written and flushed
    pub delivered: u64,
    /// Poll iterations performed
    pub ticks: u64,
    /// Events lost to cursor resynchronization
    pub skipped: u64,
}

/// One subscriber attached to one feed
pub struct FeedSubscription<S> {
    feed: String,
    log: Arc<EventLog>,
    cursor: Cursor,
    poll_interval: Duration,
    sink: S,
    cancel: CancellationToken,
    state: SubscriptionState,
    delivered: u64,
    ticks: u64,
    skipped: u64,
}

impl<S: TransportSink> FeedSubscription<S> {
    /// Attach a new subscriber with a cursor that has delivered nothing
    pub fn new(feed: impl Into<String>, log: Arc<EventLog>, sink: S, poll_interval: Duration) -> Self {
        Self {
            feed: feed.into(),
            log,
            cursor: Cursor::new(),
            poll_interval,
            sink,
            cancel: CancellationToken::new(),
            state: SubscriptionState::Attached,
            delivered: 0,
            ticks: 0,
            skipped: 0,
        }
    }

    /// Stop the loop when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Start from a specific cursor instead of the beginning
    pub fn with_cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = cursor;
        self
    }

    /// Current state
    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Current cursor
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Summary of the subscription so far
    pub fn outcome(&self) -> SubscriptionOutcome {
        SubscriptionOutcome {
            state: self.state,
            delivered: self.delivered,
            ticks: self.ticks,
            skipped: self.skipped,
        }
    }

    /// Run one poll-and-deliver step without sleeping.
    ///
    /// Returns the state after the step. Calling this on a terminated
    /// subscription does nothing.
    pub async fn tick(&mut self) -> SubscriptionState {
        if self.state.is_terminal() {
            return self.state;
        }
        self.state = SubscriptionState::Streaming;
        self.ticks += 1;

        let batch = self.log.events_since(&self.cursor);
        if batch.resynced() {
            debug!(
                feed = %self.feed,
                skipped = batch.skipped,
                "Cursor fell behind retention window, resynchronizing"
            );
            self.skipped += batch.skipped;
        }

        // A peer that stops reading can park a write or flush indefinitely,
        // so every sink await also yields to cancellation.
        if !batch.is_empty() {
            for event in &batch.events {
                let written = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return self.cancelled(),
                    result = self.sink.write_frame(encode_frame(&event.payload)) => result,
                };
                if let Err(e) = written {
                    return self.disconnect(e);
                }
            }
            let flushed = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancelled(),
                result = self.sink.flush() => result,
            };
            if let Err(e) = flushed {
                return self.disconnect(e);
            }
            self.cursor.advance(&batch);
            self.delivered += batch.len() as u64;
        }

        if batch.finished {
            self.state = SubscriptionState::Completed;
        }
        self.state
    }

    /// Drive the subscription until it disconnects or completes
    #[instrument(skip(self), fields(feed = %self.feed))]
    pub async fn run(mut self) -> SubscriptionOutcome {
        debug!(
            poll_ms = self.poll_interval.as_millis() as u64,
            "Subscription attached"
        );

        loop {
            if self.cancel.is_cancelled() || self.sink.is_closed() {
                self.state = SubscriptionState::Disconnected;
                break;
            }

            if self.tick().await.is_terminal() {
                break;
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.state = SubscriptionState::Disconnected;
                    break;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        let outcome = self.outcome();
        info!(
            state = ?outcome.state,
            delivered = outcome.delivered,
            ticks = outcome.ticks,
            skipped = outcome.skipped,
            "Subscription ended"
        );
        outcome
    }

    fn cancelled(&mut self) -> SubscriptionState {
        debug!(feed = %self.feed, "Cancelled while the sink was blocked");
        self.state = SubscriptionState::Disconnected;
        self.state
    }

    fn disconnect(&mut self, error: SinkError) -> SubscriptionState {
        debug!(feed = %self.feed, error = %error, "Sink failed, dropping subscriber");
        self.state = SubscriptionState::Disconnected;
        self.state
    }
}
