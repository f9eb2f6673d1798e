//! Command line interface

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use feedboard_logging::ConsoleConfig;

use crate::config::{ConfigError, ServerConfig};

/// Feedboard dashboard server
#[derive(Parser, Debug)]
#[command(name = "feedboard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Listen address, overriding `[server] bind`
    #[arg(short, long, global = true)]
    pub bind: Option<SocketAddr>,

    /// Default log level, overriding `[logging] default_level`
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Human-readable console logs instead of JSONL
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Also write rolling JSONL log files to this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Command {
    /// Run the dashboard (default)
    #[default]
    Serve,

    /// Print the effective configuration as TOML and exit
    PrintConfig,
}

impl Cli {
    /// The configuration file (or defaults) with command line overrides applied
    pub fn load_config(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(level) = &self.log_level {
            config.logging.default_level = level.clone();
        }
        if self.pretty {
            config.logging.console = ConsoleConfig::pretty();
        }
        if let Some(dir) = &self.log_dir {
            config.logging = config.logging.with_log_dir(dir);
        }

        Ok(config)
    }

    pub fn command(&self) -> Command {
        self.command.unwrap_or_default()
    }
}
