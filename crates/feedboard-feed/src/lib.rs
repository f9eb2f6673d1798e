//! # Feedboard Feed
//!
//! In-process live feeds for the Feedboard dashboard.
//!
//! A feed is a bounded, append-only [`EventLog`] written through a single
//! [`FeedPublisher`] and read by any number of [`FeedSubscription`]s. Each
//! subscription keeps a private [`Cursor`], polls the log on a fixed interval,
//! and pushes framed events into a [`TransportSink`] until the peer goes away
//! or the feed finishes.
//!
//! ```text
//! producer ──publish──▶ FeedPublisher ──append──▶ EventLog
//!                                                    ▲
//!                       FeedSubscription ──poll──────┘ (one per subscriber)
//!                              │
//!                              └──frames──▶ TransportSink
//! ```
//!
//! The log is the only rendezvous point: producers never wait on subscribers,
//! and delivery never removes anything from the log.
//!
//! ## Example
//!
//! ```rust,ignore
//! use feedboard_feed::{AllowAll, ChannelSink, FeedId, FeedRegistry, FeedsConfig};
//!
//! let registry = FeedRegistry::new(FeedsConfig::default())?;
//! let (sink, body) = ChannelSink::new(16);
//! registry.subscribe(&AllowAll, &(), FeedId::Messages, sink)?;
//! registry.submit(&AllowAll, &(), FeedId::Messages, "hello")?;
//! // `body` now yields b"data: hello\n\n" within one poll interval
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod log;
pub mod mock_sink;
pub mod publisher;
pub mod registry;
pub mod sink;
pub mod subscription;
pub mod synthetic;

pub use auth::{AllowAll, AuthGate};
pub use config::{FeedsConfig, MessageFeedConfig, SyntheticFeedConfig};
pub use error::{FeedError, FeedResult, SinkError};
pub use log::{Cursor, Event, EventBatch, EventLog};
pub use mock_sink::{MemorySink, MemorySinkHandle};
pub use publisher::FeedPublisher;
pub use registry::{FeedId, FeedRegistry};
pub use sink::{ChannelSink, TransportSink, encode_frame};
pub use subscription::{FeedSubscription, SubscriptionOutcome, SubscriptionState};
pub use synthetic::{ChartPoint, SyntheticFeedGenerator};
