use crate::filter::Encoding;
use crate::probe::constants::ENV_TIMESTAMP_OUTPUT;
use crate::probe::error::{ProbeError, Result};
use crate::probe::exchange::Mode;
use crate::probe::logger::RecordFormat;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug, Clone)]
#[command(name = "pipestamp")]
#[command(about = "One-way latency probe for pipes and remote shell channels")]
#[command(group(ArgGroup::new("mode").required(true).args(["receiver", "sender"])))]
#[command(after_help = "Environment variable TIMESTAMP_OUTPUT names the receiver's record log \
(use '-' for standard output).\nRedirect the sender's standard output, or it prints gibberish.")]
pub struct Config {
    /// Receive frames from standard input and log their latency
    #[arg(short, long)]
    pub receiver: bool,

    /// Send timestamped frames to standard output
    #[arg(short, long)]
    pub sender: bool,

    /// Number of frames to exchange
    #[arg(short, long)]
    pub count: usize,

    /// Padding bytes appended to every frame (must match on both ends)
    #[arg(short, long, default_value_t = 0)]
    pub block: usize,

    /// Wire encoding (must match on both ends)
    #[arg(long, default_value = "base64", value_parser = ["base64", "raw"])]
    pub encoding: String,

    /// Receiver record log; '-' aliases standard output
    #[arg(long, env = ENV_TIMESTAMP_OUTPUT)]
    pub log: Option<PathBuf>,

    /// Record format (millis, timespec or sample)
    #[arg(long, default_value = "millis", value_parser = ["millis", "timespec", "sample"])]
    pub format: String,

    /// Print a latency summary to standard error after receiving
    #[arg(long)]
    pub summary: bool,

    /// Diagnostic log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Diagnostic log format (text or json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub log_format: String,
}

impl Config {
    pub fn mode(&self) -> Mode {
        if self.receiver {
            Mode::Receive
        } else {
            Mode::Send
        }
    }

    pub fn encoding(&self) -> Result<Encoding> {
        self.encoding.parse().map_err(ProbeError::Config)
    }

    pub fn record_format(&self) -> Result<RecordFormat> {
        self.format.parse().map_err(ProbeError::Config)
    }

    /// Returns true if JSON format logging is enabled
    pub fn is_json_format(&self) -> bool {
        self.log_format.to_lowercase() == "json"
    }

    /// Validates the configuration values before any I/O happens
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");
        if self.receiver == self.sender {
            return Err(ProbeError::Config(
                "exactly one of --receiver or --sender is required".into(),
            ));
        }
        if self.count == 0 {
            return Err(ProbeError::Config("count must be > 0".into()));
        }
        if self.mode() == Mode::Receive && self.log.is_none() {
            return Err(ProbeError::Config(format!(
                "environment variable {} is missing",
                ENV_TIMESTAMP_OUTPUT
            )));
        }
        self.encoding()?;
        self.record_format()?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ProbeError::Config(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }
        debug!("Configuration validated successfully");
        Ok(())
    }
}
