//! Server configuration
//!
//! Everything has a default, so an absent or partial TOML file is valid:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:9090"
//!
//! [auth]
//! cookie_name = "feedboard_session"
//!
//! [feeds.messages]
//! retention = 50
//!
//! [feeds.line]
//! delay_ms = 1000
//!
//! [logging]
//! default_level = "debug"
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use feedboard_feed::FeedsConfig;
use feedboard_logging::LogConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default listen address
pub const DEFAULT_BIND: &str = "0.0.0.0:9090";

/// Default session cookie name
pub const DEFAULT_COOKIE_NAME: &str = "feedboard_session";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpConfig,
    pub auth: AuthConfig,
    pub feeds: FeedsConfig,
    pub logging: LogConfig,
}

/// `[server]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Listen address
    pub bind: SocketAddr,
    /// Frames buffered per stream before the subscription waits on the client
    pub stream_buffer: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 9090)),
            stream_buffer: 64,
        }
    }
}

/// `[auth]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Name of the session cookie
    pub cookie_name: String,
    /// Mark the session cookie `Secure` (HTTPS only)
    pub secure_cookie: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            secure_cookie: false,
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check invariants the feeds and the HTTP layer rely on
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.feeds
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.server.stream_buffer == 0 {
            return Err(ConfigError::Invalid(
                "server.stream_buffer must be at least 1".to_string(),
            ));
        }

        let name = &self.auth.cookie_name;
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::Invalid(format!(
                "auth.cookie_name {:?} is not a valid cookie name",
                name
            )));
        }

        Ok(())
    }
}
