use anyhow::{bail, Result};
use std::io;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::domain::models::LoggingConfig;

/// Output format for the console layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => bail!("Invalid log format: {s}"),
        }
    }
}

/// Keeps the non-blocking file writer alive for the life of the process
pub struct LoggerGuard {
    _guard: Option<WorkerGuard>,
}

/// Initialize the global tracing subscriber
///
/// Console output goes to stderr in the configured format. When
/// `log_dir` is set, a daily-rotated JSON file layer is added.
/// `RUST_LOG` overrides the configured level.
pub fn init(config: &LoggingConfig) -> Result<LoggerGuard> {
    let default_level = parse_log_level(&config.level)?;
    let format = LogFormat::parse(&config.format)?;

    let env_filter = || {
        EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy()
    };

    let console_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_current_span(true)
            .with_target(true)
            .with_filter(env_filter())
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .with_filter(env_filter())
            .boxed(),
    };

    let (file_layer, guard) = match config.log_dir.as_deref() {
        Some(dir) => {
            let appender = rolling::daily(Path::new(dir), "agent-steward.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(env_filter())
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::debug!(
        level = %config.level,
        format = ?format,
        file_output = config.log_dir.is_some(),
        "logger initialized"
    );

    Ok(LoggerGuard { _guard: guard })
}

/// Parse log level string to Level
pub fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => bail!("Invalid log level: {level}"),
    }
}
