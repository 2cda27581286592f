//! Probe module: the timed exchange and everything around it

pub mod config;
pub mod constants;
pub mod error;
pub mod exchange;
pub mod logger;
pub mod logging;
pub mod statistics;

pub use config::Config;
pub use constants::*;
pub use error::{ProbeError, Result};
pub use exchange::{Exchange, Mode, Probe};
pub use logger::{LogRecord, LogSink, Logger, RecordFormat};
pub use logging::init_logging;
pub use statistics::Statistics;
