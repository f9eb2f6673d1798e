//! Structured logging setup for Feedboard
//!
//! One builder configures the global `tracing` subscriber for every Feedboard
//! binary and test.
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines on the console (default)
//! - **Pretty Output**: Human-readable console output for development
//! - **File Rotation**: Daily/hourly log files via tracing-appender
//! - **RUST_LOG**: The environment filter always wins over the configured level
//!
//! # Quick Start
//!
//! ```ignore
//! use feedboard_logging::{FeedboardSubscriberBuilder, LogConfig};
//!
//! // JSONL to console
//! let _guard = FeedboardSubscriberBuilder::new().try_init()?;
//!
//! // Pretty output while developing
//! let _guard = FeedboardSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .try_init()?;
//!
//! // JSON on stdout plus daily files under /srv/feedboard/logs
//! let _guard = FeedboardSubscriberBuilder::new()
//!     .with_config(LogConfig::production("/srv/feedboard/logs"))
//!     .try_init()?;
//! ```
//!
//! Keep the returned guard alive for the life of the program when file output
//! is enabled, otherwise buffered lines are lost on exit.

pub mod config;

pub use config::{
    ConsoleConfig, ConsoleFormat, ConsoleWriter, DEFAULT_FILTER, FileConfig, JsonlConfig,
    LogConfig, RotationStrategy, SERVER_LOG_PREFIX,
};
pub use tracing_appender::non_blocking::WorkerGuard;

use std::fs::{self, File};

use thiserror::Error;
use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{MakeWriter, TestWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LogError {
    /// The log directory or file could not be created
    #[error("Failed to open log output {path}: {reason}")]
    Output { path: String, reason: String },

    /// A global subscriber is already installed
    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Builder for configuring and initializing the Feedboard logging subscriber
///
/// By default, console output uses JSONL format. Use `LogConfig::development()`
/// for human-readable pretty output during development.
pub struct FeedboardSubscriberBuilder {
    config: LogConfig,
}

impl FeedboardSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Switch the console between pretty and JSONL output
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.config.console.format = if pretty {
            ConsoleFormat::Pretty
        } else {
            ConsoleFormat::Json
        };
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// The configuration this builder will install
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Initialize the subscriber globally
    ///
    /// Returns the file writer guard when file output is enabled. Fails if a
    /// global subscriber has already been set or the log file cannot be opened.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LogError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.default_level));

        let (layers, guard) = self.build_layers()?;

        Registry::default()
            .with(layers)
            .with(env_filter)
            .try_init()
            .map_err(|e| LogError::Init(e.to_string()))?;

        Ok(guard)
    }

    fn build_layers(&self) -> Result<(Vec<BoxedLayer>, Option<WorkerGuard>), LogError> {
        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;

        if self.config.console.enabled {
            layers.push(match self.config.console.writer {
                ConsoleWriter::Stdout => self.console_layer(std::io::stdout),
                ConsoleWriter::Stderr => self.console_layer(std::io::stderr),
                ConsoleWriter::TestCapture => self.console_layer(TestWriter::new()),
            });
        }

        if let Some(file_config) = &self.config.file {
            let (writer, file_guard) = create_file_writer(file_config)?;
            layers.push(self.jsonl_layer(writer));
            guard = Some(file_guard);
        }

        Ok((layers, guard))
    }

    fn console_layer<W>(&self, writer: W) -> BoxedLayer
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        match self.config.console.format {
            ConsoleFormat::Pretty => tracing_subscriber::fmt::layer()
                .with_ansi(self.config.console.ansi)
                .with_target(true)
                .with_writer(writer)
                .boxed(),
            ConsoleFormat::Json => self.jsonl_layer(writer),
        }
    }

    fn jsonl_layer<W>(&self, writer: W) -> BoxedLayer
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let jsonl = &self.config.jsonl;
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(jsonl.include_spans)
            .flatten_event(jsonl.flatten_events)
            .with_file(jsonl.include_location)
            .with_line_number(jsonl.include_location)
            .with_writer(writer)
            .boxed()
    }
}

impl Default for FeedboardSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncates for `Never` rotation, appends for the rolling strategies
fn create_file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LogError> {
    let output_error = |reason: String| LogError::Output {
        path: config.directory.display().to_string(),
        reason,
    };

    let rotation = match config.rotation {
        RotationStrategy::Never => {
            fs::create_dir_all(&config.directory).map_err(|e| output_error(e.to_string()))?;
            let file =
                File::create(config.single_file_path()).map_err(|e| output_error(e.to_string()))?;
            return Ok(tracing_appender::non_blocking(file));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&config.prefix)
        .filename_suffix("log")
        .build(&config.directory)
        .map_err(|e| output_error(e.to_string()))?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize a quiet subscriber for tests; repeated calls are ignored
pub fn init_testing() {
    let _ = FeedboardSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}
