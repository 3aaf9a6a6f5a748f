//! Logging setup for the bridge
//!
//! Library code only emits `tracing` events; this module installs a
//! subscriber for binaries that want one.

use std::str::FromStr;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// How much to print, and how
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber is installed
    Silent,
    /// Compact single-line output at `info`
    Development,
    /// Pretty multi-line output at `debug`, with source locations
    Debug,
}

impl FromStr for LoggingMode {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silent" => Ok(LoggingMode::Silent),
            "development" | "dev" => Ok(LoggingMode::Development),
            "debug" => Ok(LoggingMode::Debug),
            other => Err(LoggingError::InvalidMode(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Unknown logging mode: {0}")]
    InvalidMode(String),
}

/// Install a global subscriber for `mode`
///
/// # Environment Variables
///
/// - `MUSICCAST_LOG_LEVEL`: filter directive, e.g. `musiccast_state=debug`
/// - `RUST_LOG`: used when `MUSICCAST_LOG_LEVEL` is unset
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    init_logging_with_level(mode, None)
}

/// Like [`init_logging`], but an explicit `level` directive wins over the
/// environment
pub fn init_logging_with_level(mode: LoggingMode, level: Option<&str>) -> Result<(), LoggingError> {
    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => Registry::default()
            .with(fmt::layer().with_target(false).compact())
            .with(filter(level, "info"))
            .try_init()
            .map_err(|e| LoggingError::TracingInit(e.to_string())),
        LoggingMode::Debug => Registry::default()
            .with(
                fmt::layer()
                    .pretty()
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter(level, "debug"))
            .try_init()
            .map_err(|e| LoggingError::TracingInit(e.to_string())),
    }
}

fn filter(level: Option<&str>, default_level: &str) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(level),
        None => env_filter(default_level),
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    std::env::var("MUSICCAST_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new(default_level))
}
