//! `[logging]` section of the server configuration
//!
//! Levels are `EnvFilter` directives, so a preset can quiet one crate while
//! keeping another verbose. `RUST_LOG` still replaces them at startup.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Directive used when nothing else is configured
pub const DEFAULT_FILTER: &str = "info";

/// Connection-level noise from hyper is rarely useful outside debugging
const PRODUCTION_FILTER: &str = "info,hyper=warn";

/// Per-request spans from `TraceLayer` and per-tick feed events
const DEVELOPMENT_FILTER: &str = "debug,tower_http=debug,feedboard_feed=trace,hyper=info";

/// Prefix of the rolling files written by the server
pub const SERVER_LOG_PREFIX: &str = "feedboard-server";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `info,feedboard_feed=debug`
    pub default_level: String,

    pub console: ConsoleConfig,

    /// Rolling JSONL files, off unless a directory is given
    pub file: Option<FileConfig>,

    /// Field layout of every JSON line, console and file alike
    pub jsonl: JsonlConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: DEFAULT_FILTER.to_string(),
            console: ConsoleConfig::default(),
            file: None,
            jsonl: JsonlConfig::default(),
        }
    }
}

impl LogConfig {
    /// Colored human-readable console with request and feed tracing
    pub fn development() -> Self {
        Self {
            default_level: DEVELOPMENT_FILTER.to_string(),
            console: ConsoleConfig::pretty(),
            jsonl: JsonlConfig {
                include_location: true,
                ..JsonlConfig::default()
            },
            ..Self::default()
        }
    }

    /// JSON on stdout for the process supervisor, plus daily files in `log_dir`
    pub fn production(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            default_level: PRODUCTION_FILTER.to_string(),
            file: Some(FileConfig::in_dir(log_dir)),
            ..Self::default()
        }
    }

    /// Warnings only, routed through the test harness so passing tests stay quiet
    pub fn testing() -> Self {
        Self {
            default_level: "warn".to_string(),
            console: ConsoleConfig {
                enabled: true,
                format: ConsoleFormat::Pretty,
                ansi: false,
                writer: ConsoleWriter::TestCapture,
            },
            ..Self::default()
        }
    }

    /// Add or redirect file output, keeping any configured prefix and rotation
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        let directory = log_dir.into();
        self.file = Some(match self.file.take() {
            Some(file) => FileConfig { directory, ..file },
            None => FileConfig::in_dir(directory),
        });
        self
    }
}

/// Console line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable multi-field lines
    Pretty,
}

/// Where console lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ConsoleWriter {
    #[default]
    Stdout,
    Stderr,
    /// libtest's captured output; shown only for failing tests
    TestCapture,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub format: ConsoleFormat,
    /// Colors; only honored by the pretty format
    pub ansi: bool,
    pub writer: ConsoleWriter,
}

impl ConsoleConfig {
    /// Colored pretty output on stdout
    pub fn pretty() -> Self {
        Self {
            enabled: true,
            format: ConsoleFormat::Pretty,
            ansi: true,
            writer: ConsoleWriter::Stdout,
        }
    }

    pub fn is_pretty(&self) -> bool {
        self.format == ConsoleFormat::Pretty
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: ConsoleFormat::Json,
            ansi: false,
            writer: ConsoleWriter::Stdout,
        }
    }
}

/// Rolling JSONL file output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// Files are named `<prefix>.<date>.log`, or `<prefix>.log` without rotation
    pub prefix: String,
    pub rotation: RotationStrategy,
}

impl FileConfig {
    /// Daily server logs in `directory`
    pub fn in_dir(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    /// Path of the file written when rotation is disabled
    pub fn single_file_path(&self) -> PathBuf {
        self.directory.join(format!("{}.log", self.prefix))
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: SERVER_LOG_PREFIX.to_string(),
            rotation: RotationStrategy::Daily,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationStrategy {
    #[default]
    Daily,
    Hourly,
    /// One file, truncated at startup
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonlConfig {
    /// Event fields at the top level instead of under `fields`
    pub flatten_events: bool,
    /// Enclosing spans, e.g. the `feed` of a subscription
    pub include_spans: bool,
    pub include_location: bool,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            flatten_events: true,
            include_spans: true,
            include_location: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_json_on_stdout() {
        let config = LogConfig::default();
        assert_eq!(config.default_level, DEFAULT_FILTER);
        assert!(config.console.enabled);
        assert!(!config.console.is_pretty());
        assert_eq!(config.console.writer, ConsoleWriter::Stdout);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_development_traces_requests_and_feeds() {
        let config = LogConfig::development();
        assert!(config.console.is_pretty());
        assert!(config.console.ansi);
        assert!(config.default_level.contains("tower_http=debug"));
        assert!(config.default_level.contains("feedboard_feed=trace"));
    }

    #[test]
    fn test_production_writes_server_files_to_given_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig::production(dir.path());

        assert!(config.default_level.contains("hyper=warn"));
        assert!(!config.console.is_pretty());
        let file = config.file.expect("production logs to files");
        assert_eq!(file.directory, dir.path());
        assert_eq!(file.prefix, SERVER_LOG_PREFIX);
        assert_eq!(file.rotation, RotationStrategy::Daily);
    }

    #[test]
    fn test_testing_goes_through_capture() {
        let config = LogConfig::testing();
        assert_eq!(config.console.writer, ConsoleWriter::TestCapture);
        assert!(!config.console.ansi);
    }

    #[test]
    fn test_log_dir_keeps_configured_rotation() {
        let mut config = LogConfig::default();
        config.file = Some(FileConfig {
            rotation: RotationStrategy::Hourly,
            prefix: "edge".to_string(),
            ..FileConfig::default()
        });

        let file = config.with_log_dir("/srv/feedboard/logs").file.unwrap();
        assert_eq!(file.directory, PathBuf::from("/srv/feedboard/logs"));
        assert_eq!(file.rotation, RotationStrategy::Hourly);
        assert_eq!(file.single_file_path(), PathBuf::from("/srv/feedboard/logs/edge.log"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: LogConfig = toml::from_str(
            r#"
            default_level = "info,feedboard_feed=debug"
            [console]
            format = "pretty"
            writer = "stderr"
            [file]
            rotation = "hourly"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_level, "info,feedboard_feed=debug");
        assert!(config.console.is_pretty());
        assert_eq!(config.console.writer, ConsoleWriter::Stderr);
        let file = config.file.unwrap();
        assert_eq!(file.rotation, RotationStrategy::Hourly);
        assert_eq!(file.prefix, SERVER_LOG_PREFIX);
    }
}
