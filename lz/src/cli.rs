//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// lz - lazy section activation for long multi-group record editors
#[derive(Parser)]
#[command(
    name = "lz",
    about = "Simulate and check lazily revealed section groups",
    version
)]
pub struct Cli {
    /// Path to page config file
    #[arg(short, long, global = true, help = "Path to page config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Shorthand for --log-level DEBUG
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Effective log level: --log-level, then --verbose, then INFO
    pub fn log_level(&self) -> Option<&str> {
        match (&self.log_level, self.verbose) {
            (Some(level), _) => Some(level.as_str()),
            (None, true) => Some("DEBUG"),
            (None, false) => None,
        }
    }
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Mount every configured group and play the page script
    Simulate {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Append every coordinator event to this JSONL file
        #[arg(long = "events-log", value_name = "FILE")]
        events_log: Option<PathBuf>,

        /// Disable colored output
        #[arg(long = "no-color")]
        no_color: bool,
    },

    /// Validate the page configuration
    Check,

    /// List catalog groups, their sections and default tunables
    Sections {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lazysection")
        .join("logs")
        .join("lazysection.log");
    debug!(?path, "get_log_path: returning path");
    path
}
