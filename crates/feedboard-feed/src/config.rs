//! Configuration for the live feeds

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FeedError, FeedResult};
use crate::synthetic::ChartPoint;

/// Configuration for the chat-like message feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageFeedConfig {
    /// Maximum retained messages
    pub retention: usize,
    /// Subscriber poll interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for MessageFeedConfig {
    fn default() -> Self {
        Self {
            retention: 20,
            poll_interval_ms: 500,
        }
    }
}

impl MessageFeedConfig {
    /// Subscriber poll interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn validate(&self) -> FeedResult<()> {
        if self.retention == 0 {
            return Err(FeedError::invalid_config("messages.retention must be at least 1"));
        }
        if self.poll_interval_ms == 0 {
            return Err(FeedError::invalid_config("messages.poll_interval_ms must be positive"));
        }
        Ok(())
    }
}

/// Parameters of a synthetic chart feed
///
/// Point `i` (1-based) has `value = (i * multiplier) % range + offset` and
/// label `"<prefix> <i>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticFeedConfig {
    /// Number of points produced (K)
    pub count: u32,
    /// Delay after each point, in milliseconds
    pub delay_ms: u64,
    /// Subscriber poll interval in milliseconds
    pub poll_interval_ms: u64,
    pub multiplier: u64,
    pub range: u64,
    pub offset: u64,
    /// Label prefix
    pub prefix: String,
}

impl SyntheticFeedConfig {
    /// Preset for the line chart
    pub fn line() -> Self {
        Self {
            count: 20,
            delay_ms: 2000,
            poll_interval_ms: 250,
            multiplier: 7,
            range: 30,
            offset: 5,
            prefix: "Point".to_string(),
        }
    }

    /// Preset for the bar chart
    pub fn bar() -> Self {
        Self {
            multiplier: 3,
            range: 25,
            offset: 2,
            prefix: "BPoint".to_string(),
            ..Self::line()
        }
    }

    /// Set the number of points
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Set the delay between points
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the subscriber poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Compute point `index`.
    ///
    /// The product wraps and the offset saturates, so any configured values
    /// yield a point instead of overflowing.
    pub fn point(&self, index: u32) -> ChartPoint {
        let raw = u64::from(index).wrapping_mul(self.multiplier);
        ChartPoint {
            label: format!("{} {}", self.prefix, index),
            value: raw
                .checked_rem(self.range)
                .unwrap_or(0)
                .saturating_add(self.offset),
        }
    }

    /// Delay after each point
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Subscriber poll interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn validate(&self, name: &str) -> FeedResult<()> {
        if self.range == 0 {
            return Err(FeedError::invalid_config(format!("{}.range must be positive", name)));
        }
        if self.poll_interval_ms == 0 {
            return Err(FeedError::invalid_config(format!(
                "{}.poll_interval_ms must be positive",
                name
            )));
        }
        Ok(())
    }
}

/// Configuration of every feed
///
/// Chart sections are read as overrides on top of their presets, so
/// `[feeds.bar] delay_ms = 500` keeps the bar formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawFeedsConfig")]
pub struct FeedsConfig {
    pub messages: MessageFeedConfig,
    pub line: SyntheticFeedConfig,
    pub bar: SyntheticFeedConfig,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawFeedsConfig {
    messages: MessageFeedConfig,
    line: SyntheticOverrides,
    bar: SyntheticOverrides,
}

#[derive(Default, Deserialize)]
struct SyntheticOverrides {
    count: Option<u32>,
    delay_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
    multiplier: Option<u64>,
    range: Option<u64>,
    offset: Option<u64>,
    prefix: Option<String>,
}

impl SyntheticOverrides {
    fn apply(self, base: SyntheticFeedConfig) -> SyntheticFeedConfig {
        SyntheticFeedConfig {
            count: self.count.unwrap_or(base.count),
            delay_ms: self.delay_ms.unwrap_or(base.delay_ms),
            poll_interval_ms: self.poll_interval_ms.unwrap_or(base.poll_interval_ms),
            multiplier: self.multiplier.unwrap_or(base.multiplier),
            range: self.range.unwrap_or(base.range),
            offset: self.offset.unwrap_or(base.offset),
            prefix: self.prefix.unwrap_or(base.prefix),
        }
    }
}

impl From<RawFeedsConfig> for FeedsConfig {
    fn from(raw: RawFeedsConfig) -> Self {
        Self {
            messages: raw.messages,
            line: raw.line.apply(SyntheticFeedConfig::line()),
            bar: raw.bar.apply(SyntheticFeedConfig::bar()),
        }
    }
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            messages: MessageFeedConfig::default(),
            line: SyntheticFeedConfig::line(),
            bar: SyntheticFeedConfig::bar(),
        }
    }
}

impl FeedsConfig {
    /// Reject configurations the feeds cannot run with
    pub fn validate(&self) -> FeedResult<()> {
        self.messages.validate()?;
        self.line.validate("line")?;
        self.bar.validate("bar")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FeedsConfig::default();
        assert_eq!(config.messages.retention, 20);
        assert_eq!(config.messages.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.line.count, 20);
        assert_eq!(config.line.delay(), Duration::from_secs(2));
        assert_eq!(config.bar.prefix, "BPoint");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_retention_rejected() {
        let mut config = FeedsConfig::default();
        config.messages.retention = 0;
        assert!(matches!(config.validate(), Err(FeedError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_range_rejected() {
        let mut config = FeedsConfig::default();
        config.bar.range = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bar.range"));
    }

    #[test]
    fn test_partial_chart_section_keeps_preset() {
        let config: FeedsConfig =
            serde_json::from_str(r#"{"bar":{"delay_ms":500},"messages":{"retention":3}}"#)
                .unwrap();
        assert_eq!(config.bar.delay_ms, 500);
        assert_eq!(config.bar.prefix, "BPoint");
        assert_eq!(config.bar.multiplier, 3);
        assert_eq!(config.line, SyntheticFeedConfig::line());
        assert_eq!(config.messages.retention, 3);
        assert_eq!(config.messages.poll_interval_ms, 500);
    }

    #[test]
    fn test_bar_points() {
        let bar = SyntheticFeedConfig::bar();
        assert_eq!(bar.point(1).value, 5);
        assert_eq!(bar.point(9).value, 4); // 27 % 25 + 2
        assert_eq!(bar.point(9).label, "BPoint 9");
    }

    #[test]
    fn test_extreme_factors_do_not_overflow() {
        let huge = SyntheticFeedConfig {
            multiplier: u64::MAX,
            range: 10,
            offset: 0,
            ..SyntheticFeedConfig::line()
        };
        // 2 * u64::MAX wraps to u64::MAX - 1
        assert_eq!(huge.point(2).value, 4);
        assert_eq!(huge.point(u32::MAX).label, format!("Point {}", u32::MAX));

        let pinned = SyntheticFeedConfig {
            offset: u64::MAX,
            ..huge
        };
        assert_eq!(pinned.point(3).value, u64::MAX);
        assert!(pinned.validate("line").is_ok());
    }
}
