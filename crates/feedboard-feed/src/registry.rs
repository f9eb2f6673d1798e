//! Named feeds and their entry points
//!
//! The registry owns the process-wide message feed and the chart presets, and
//! is where producers and subscribers attach. Both entry points check an
//! [`AuthGate`] first.
//!
//! Chart feeds are finite: every chart subscriber gets its own log and its own
//! generator run, so each connection sees the full series from point 1.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::auth::AuthGate;
use crate::config::{FeedsConfig, SyntheticFeedConfig};
use crate::error::{FeedError, FeedResult};
use crate::publisher::FeedPublisher;
use crate::sink::TransportSink;
use crate::subscription::{FeedSubscription, SubscriptionOutcome};
use crate::synthetic::SyntheticFeedGenerator;

/// Identifier of a live feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedId {
    /// Chat-like message feed
    Messages,
    /// Line chart samples
    Line,
    /// Bar chart samples
    Bar,
}

impl FeedId {
    /// All feeds
    pub const ALL: [FeedId; 3] = [FeedId::Messages, FeedId::Line, FeedId::Bar];

    /// Stable name
    pub fn as_str(self) -> &'static str {
        match self {
            FeedId::Messages => "messages",
            FeedId::Line => "line",
            FeedId::Bar => "bar",
        }
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedId {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeedId::ALL
            .into_iter()
            .find(|feed| feed.as_str() == s)
            .ok_or_else(|| FeedError::UnknownFeed(s.to_string()))
    }
}

/// Decrements the live subscriber count when the subscription task ends
struct SubscriberGuard {
    feed: FeedId,
    counts: Arc<DashMap<FeedId, usize>>,
}

impl SubscriberGuard {
    fn attach(feed: FeedId, counts: &Arc<DashMap<FeedId, usize>>) -> Self {
        let live = {
            let mut count = counts.entry(feed).or_insert(0);
            *count += 1;
            *count
        };
        info!(feed = %feed, live, "Subscriber attached");
        Self {
            feed,
            counts: Arc::clone(counts),
        }
    }
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        let live = self
            .counts
            .get_mut(&self.feed)
            .map(|mut count| {
                *count = count.saturating_sub(1);
                *count
            })
            .unwrap_or(0);
        info!(feed = %self.feed, live, "Subscriber detached");
    }
}

/// Registry of every live feed
pub struct FeedRegistry {
    config: FeedsConfig,
    messages: Arc<FeedPublisher>,
    subscribers: Arc<DashMap<FeedId, usize>>,
    shutdown: CancellationToken,
}

impl FeedRegistry {
    /// Create the registry and the message feed
    pub fn new(config: FeedsConfig) -> FeedResult<Self> {
        config.validate()?;
        let messages = Arc::new(FeedPublisher::new(
            FeedId::Messages.as_str(),
            config.messages.retention,
        ));
        Ok(Self {
            config,
            messages,
            subscribers: Arc::new(DashMap::new()),
            shutdown: CancellationToken::new(),
        })
    }

    /// Feed configuration
    pub fn config(&self) -> &FeedsConfig {
        &self.config
    }

    /// Publisher of the message feed
    pub fn messages(&self) -> &Arc<FeedPublisher> {
        &self.messages
    }

    /// Submit one event to `feed` on behalf of `caller`.
    ///
    /// Returns the assigned sequence, or `None` for an empty event.
    pub fn submit<G, C>(
        &self,
        gate: &G,
        caller: &C,
        feed: FeedId,
        payload: impl Into<Bytes>,
    ) -> FeedResult<Option<u64>>
    where
        G: AuthGate<C> + ?Sized,
        C: ?Sized,
    {
        if !gate.is_authorized(caller) {
            return Err(FeedError::Unauthorized);
        }
        match feed {
            FeedId::Messages => Ok(self.messages.publish(payload)),
            FeedId::Line | FeedId::Bar => Err(FeedError::ReadOnly(feed)),
        }
    }

    /// Attach `sink` as a subscriber of `feed` on behalf of `caller`.
    ///
    /// The subscription runs on its own task until the sink fails, the feed
    /// completes, or the registry shuts down.
    #[instrument(skip_all, fields(feed = %feed))]
    pub fn subscribe<G, C, S>(
        &self,
        gate: &G,
        caller: &C,
        feed: FeedId,
        sink: S,
    ) -> FeedResult<JoinHandle<SubscriptionOutcome>>
    where
        G: AuthGate<C> + ?Sized,
        C: ?Sized,
        S: TransportSink + 'static,
    {
        if !gate.is_authorized(caller) {
            return Err(FeedError::Unauthorized);
        }

        let guard = SubscriberGuard::attach(feed, &self.subscribers);
        let cancel = self.shutdown.child_token();

        let handle = match feed {
            FeedId::Messages => {
                let subscription = FeedSubscription::new(
                    feed.as_str(),
                    self.messages.log(),
                    sink,
                    self.config.messages.poll_interval(),
                )
                .with_cancellation(cancel);

                tokio::spawn(async move {
                    let _guard = guard;
                    subscription.run().await
                })
            }
            FeedId::Line | FeedId::Bar => {
                let chart = self.chart_config(feed).clone();
                let publisher = Arc::new(FeedPublisher::new(feed.as_str(), chart.count as usize));
                let subscription = FeedSubscription::new(
                    feed.as_str(),
                    publisher.log(),
                    sink,
                    chart.poll_interval(),
                )
                .with_cancellation(cancel.clone());

                let generator_cancel = cancel.child_token();
                SyntheticFeedGenerator::new(chart, publisher).spawn(generator_cancel.clone());

                tokio::spawn(async move {
                    let _guard = guard;
                    let outcome = subscription.run().await;
                    generator_cancel.cancel();
                    outcome
                })
            }
        };

        Ok(handle)
    }

    /// Live subscribers of `feed`
    pub fn subscriber_count(&self, feed: FeedId) -> usize {
        self.subscribers.get(&feed).map_or(0, |count| *count)
    }

    /// Cancel every running subscription and generator
    pub fn shutdown(&self) {
        info!("Shutting down live feeds");
        self.shutdown.cancel();
    }

    fn chart_config(&self, feed: FeedId) -> &SyntheticFeedConfig {
        match feed {
            FeedId::Bar => &self.config.bar,
            _ => &self.config.line,
        }
    }
}
