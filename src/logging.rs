//! Structured logging setup.
//!
//! Pretty output for a terminal, JSON for journald or log shippers, compact
//! for small serial consoles. `RUST_LOG` overrides the configured level.

use serde::Deserialize;
use std::io;
use tracing::Level;
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

/// Logging format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty human-readable output
    #[default]
    Pretty,
    /// JSON output for log aggregation
    Json,
    /// Compact single-line output
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output format (pretty, json, compact)
    pub format: LogFormat,
    /// Minimum log level
    pub level: Level,
    /// Include span events (enter/exit)
    pub with_spans: bool,
    /// Include target (module path)
    pub with_target: bool,
    /// Include file name and line number
    pub with_file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            level: Level::INFO,
            with_spans: false,
            with_target: true,
            with_file: false,
        }
    }
}

impl LogConfig {
    /// Create config for JSON logging.
    pub const fn json() -> Self {
        Self {
            format: LogFormat::Json,
            level: Level::INFO,
            with_spans: true,
            with_target: true,
            with_file: false,
        }
    }

    /// Set the log level.
    #[must_use]
    pub const fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set the log format.
    #[must_use]
    pub const fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        if matches!(format, LogFormat::Json) {
            self.with_spans = true;
        }
        self
    }
}

/// Initialize the global tracing subscriber.
///
/// Should be called once at startup. A second call is a no-op.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let span_events = if config.with_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    match config.format {
        LogFormat::Pretty => {
            let subscriber = tracing_subscriber::registry().with(filter).with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(config.with_target)
                    .with_file(config.with_file)
                    .with_line_number(config.with_file)
                    .with_span_events(span_events),
            );
            let _ = tracing::subscriber::set_global_default(subscriber);
        },
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry().with(filter).with(
                fmt::layer()
                    .json()
                    .with_target(config.with_target)
                    .with_file(config.with_file)
                    .with_line_number(config.with_file)
                    .with_span_events(span_events)
                    .with_writer(io::stdout),
            );
            let _ = tracing::subscriber::set_global_default(subscriber);
        },
        LogFormat::Compact => {
            let subscriber = tracing_subscriber::registry().with(filter).with(
                fmt::layer()
                    .compact()
                    .with_ansi(false)
                    .with_target(config.with_target)
                    .with_span_events(span_events),
            );
            let _ = tracing::subscriber::set_global_default(subscriber);
        },
    }
}

/// Log a completed HTTP request.
pub fn log_request_complete(method: &str, path: &str, status: u16, duration_ms: u64) {
    if status >= 500 {
        tracing::warn!(
            method = %method,
            path = %path,
            status = status,
            duration_ms = duration_ms,
            "Request failed"
        );
    } else {
        tracing::debug!(
            method = %method,
            path = %path,
            status = status,
            duration_ms = duration_ms,
            "Request completed"
        );
    }
}
