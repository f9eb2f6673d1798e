//! Error types for feedboard-feed
//!
//! Most feed operations cannot fail: appends are bounded by construction and
//! empty events are dropped silently. What remains is transport failure on the
//! subscriber side and refusal at the entry points.

use thiserror::Error;

use crate::registry::FeedId;

/// Failure of a transport sink while writing or flushing frames.
///
/// Subscriptions consume this themselves: a failed sink ends the subscription
/// and is never reported to the entry points.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The peer went away
    #[error("Peer disconnected")]
    Disconnected,
}

/// Errors surfaced by the feed entry points
#[derive(Debug, Error)]
pub enum FeedError {
    /// Caller did not pass the authorization gate
    #[error("Caller is not authorized")]
    Unauthorized,

    /// Feed name did not match any known feed
    #[error("Unknown feed: {0}")]
    UnknownFeed(String),

    /// Feed does not accept external producers
    #[error("Feed {0} does not accept submissions")]
    ReadOnly(FeedId),

    /// Feed configuration was rejected
    #[error("Invalid feed configuration: {0}")]
    InvalidConfig(String),
}

impl FeedError {
    /// Create a new InvalidConfig error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Result type alias for feed operations
pub type FeedResult<T> = Result<T, FeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_display() {
        let err = FeedError::invalid_config("line.range must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid feed configuration: line.range must be positive"
        );
    }

    #[test]
    fn test_read_only_display() {
        let err = FeedError::ReadOnly(FeedId::Line);
        assert_eq!(err.to_string(), "Feed line does not accept submissions");
    }
}
