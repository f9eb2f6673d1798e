use std::sync::Arc;

use feedboard_feed::{FeedRegistry, FeedResult};

use crate::auth::{SessionStore, UserStore};
use crate::config::ServerConfig;

/// Shared state behind every handler
pub struct AppState {
    pub config: ServerConfig,
    pub registry: FeedRegistry,
    pub users: UserStore,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: ServerConfig) -> FeedResult<Arc<Self>> {
        let registry = FeedRegistry::new(config.feeds.clone())?;

        Ok(Arc::new(Self {
            config,
            registry,
            users: UserStore::new(),
            sessions: SessionStore::new(),
        }))
    }
}
