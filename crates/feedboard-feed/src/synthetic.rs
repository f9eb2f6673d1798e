//! Deterministic chart feed producer

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::SyntheticFeedConfig;
use crate::publisher::FeedPublisher;

/// One chart sample, published as `{"label":...,"value":...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: u64,
}

/// Publishes `count` chart points, one per delay, then finishes the feed
pub struct SyntheticFeedGenerator {
    config: SyntheticFeedConfig,
    publisher: Arc<FeedPublisher>,
}

impl SyntheticFeedGenerator {
    /// Create a generator driving `publisher`
    pub fn new(config: SyntheticFeedConfig, publisher: Arc<FeedPublisher>) -> Self {
        Self { config, publisher }
    }

    /// Every point this generator will publish, in order
    pub fn points(&self) -> impl Iterator<Item = ChartPoint> + '_ {
        (1..=self.config.count).map(|i| self.config.point(i))
    }

    /// Publish all points, sleeping after each. Returns how many were published.
    ///
    /// Cancellation stops early; the feed is finished either way.
    pub async fn run(self, cancel: CancellationToken) -> u32 {
        let mut published = 0;

        for index in 1..=self.config.count {
            let point = self.config.point(index);
            match serde_json::to_string(&point) {
                Ok(payload) => {
                    if self.publisher.publish(payload).is_some() {
                        published += 1;
                    }
                }
                Err(e) => warn!(feed = %self.publisher.name(), index, error = %e, "Failed to encode chart point"),
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(feed = %self.publisher.name(), published, "Generator cancelled");
                    break;
                }
                _ = tokio::time::sleep(self.config.delay()) => {}
            }
        }

        self.publisher.finish();
        published
    }

    /// Run on a background task
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<u32> {
        tokio::spawn(self.run(cancel))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::log::Cursor;

    fn line_generator(count: u32) -> (SyntheticFeedGenerator, Arc<FeedPublisher>) {
        let publisher = Arc::new(FeedPublisher::new("line", count as usize));
        let config = SyntheticFeedConfig::line().with_count(count);
        (SyntheticFeedGenerator::new(config, Arc::clone(&publisher)), publisher)
    }

    #[test]
    fn test_line_points_are_deterministic() {
        let (generator, _) = line_generator(20);
        let first: Vec<_> = generator.points().collect();
        let second: Vec<_> = generator.points().collect();
        assert_eq!(first, second);

        assert_eq!(first[0], ChartPoint { label: "Point 1".into(), value: 12 });
        assert_eq!(first[3].value, 33);
        assert_eq!(first.len(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_publishes_json_and_finishes() {
        let (generator, publisher) = line_generator(3);
        let published = generator.run(CancellationToken::new()).await;
        assert_eq!(published, 3);
        assert!(publisher.is_finished());

        let batch = publisher.log().events_since(&Cursor::new());
        let texts: Vec<_> = batch.events.iter().map(|e| e.text().into_owned()).collect();
        assert_eq!(
            texts,
            vec![
                r#"{"label":"Point 1","value":12}"#,
                r#"{"label":"Point 2","value":19}"#,
                r#"{"label":"Point 3","value":26}"#,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_points_are_spaced_by_delay() {
        let (generator, publisher) = line_generator(5);
        let handle = generator.spawn(CancellationToken::new());

        tokio::time::sleep(Duration::from_millis(4100)).await;
        assert_eq!(publisher.log().len(), 3);
        assert!(!publisher.is_finished());

        assert_eq!(handle.await.unwrap(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_early_and_finishes() {
        let (generator, publisher) = line_generator(20);
        let cancel = CancellationToken::new();
        let handle = generator.spawn(cancel.clone());

        tokio::time::sleep(Duration::from_millis(2500)).await;
        cancel.cancel();

        assert_eq!(handle.await.unwrap(), 2);
        assert!(publisher.is_finished());
    }
}
