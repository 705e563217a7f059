//! Logging setup
//!
//! Structured logging goes through `tracing`. The pipeline emits events under
//! the `classmap::*` targets; this module installs the subscriber that prints
//! them.
//!
//! # Environment Variables
//!
//! - `CLASSMAP_LOG_LEVEL`: log level (trace|debug|info|warn|error|off)
//! - `CLASSMAP_LOG_FORMAT`: log format (compact|pretty|json)
//! - `RUST_LOG`: standard `EnvFilter` directives, takes precedence over the level
//!
//! ```bash
//! # Show assembler decisions only
//! RUST_LOG="classmap::analysis::assembler=debug" classmap analyze ./src
//! ```

use std::str::FromStr;
use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Registry,
};

/// Why the subscriber was not installed
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("{0}")]
    UnknownFormat(String),

    /// Another global subscriber or logger won the race
    #[error("a global subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] TryInitError),
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact single-line format
    Compact,
    /// Pretty multi-line format with colors
    Pretty,
    /// JSON format for log aggregation
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

impl LogFormat {
    /// Get all valid format names
    pub fn variants() -> &'static [&'static str] {
        &["compact", "pretty", "json"]
    }
}

/// Initialize the tracing subscriber
///
/// `level` falls back to `CLASSMAP_LOG_LEVEL`, then `warn`. `format` falls back
/// to `CLASSMAP_LOG_FORMAT`, then `compact`. Logs go to stderr so that diagram
/// text on stdout stays clean.
///
/// Returns an error for an unknown format or when a global subscriber is
/// already installed.
pub fn init_logging(level: Option<&str>, format: Option<&str>) -> Result<(), LoggingError> {
    let log_level = level
        .map(|s| s.to_string())
        .or_else(|| std::env::var("CLASSMAP_LOG_LEVEL").ok())
        .unwrap_or_else(|| "warn".to_string());

    let log_format = format
        .map(|s| s.to_string())
        .or_else(|| std::env::var("CLASSMAP_LOG_FORMAT").ok())
        .unwrap_or_else(|| "compact".to_string());

    let filter = if log_level == "off" {
        EnvFilter::new("off")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&log_level))
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let format = LogFormat::from_str(&log_format).map_err(LoggingError::UnknownFormat)?;

    match format {
        LogFormat::Compact => {
            Registry::default()
                .with(filter)
                .with(
                    fmt::Layer::default()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .with_level(true)
                        .with_span_events(FmtSpan::NONE),
                )
                .try_init()?;
        }
        LogFormat::Pretty => {
            Registry::default()
                .with(filter)
                .with(
                    fmt::Layer::default()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true)
                        .with_span_events(FmtSpan::CLOSE)
                        .pretty(),
                )
                .try_init()?;
        }
        LogFormat::Json => {
            Registry::default()
                .with(filter)
                .with(
                    fmt::Layer::default()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE)
                        .json(),
                )
                .try_init()?;
        }
    }

    Ok(())
}
