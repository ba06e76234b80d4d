//! Process-wide logging.
//!
//! Console output in text or JSON, plus an optional daily-rolling file.
//! `RUST_LOG` overrides the configured level. Records emitted through the
//! `log` macros are forwarded into `tracing`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::{LogFormat, LoggingConfig};

/// File name prefix of the rolling log; the date is appended per day.
pub const LOG_FILE_NAME: &str = "nfce-ingest.log";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to create log directory '{path}': {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid log filter '{filter}': {reason}")]
    Filter { filter: String, reason: String },

    #[error("Failed to install logger: {0}")]
    Install(String),
}

/// Keeps the background file writer alive. Dropping it flushes the log file.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(&config.level, env.as_deref())?;

    let mut layers: Vec<BoxedLayer> = vec![console_layer(config.format)];

    let file_guard = match &config.directory {
        Some(dir) => {
            let dir = Path::new(dir);
            std::fs::create_dir_all(dir).map_err(|e| LoggingError::Directory {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = match config.format {
                LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(false).boxed(),
                LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
            };
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    let subscriber = tracing_subscriber::registry().with(layers).with(filter);

    tracing_log::LogTracer::init().map_err(|e| LoggingError::Install(e.to_string()))?;
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| LoggingError::Install(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn console_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Text => fmt::layer().with_writer(std::io::stderr).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    }
}

/// The filter from `RUST_LOG` when set, the configured level otherwise.
fn build_filter(level: &str, env: Option<&str>) -> Result<EnvFilter, LoggingError> {
    let directives = match env {
        Some(env) if !env.trim().is_empty() => env,
        _ => level,
    };
    EnvFilter::try_new(directives).map_err(|e| LoggingError::Filter {
        filter: directives.to_string(),
        reason: e.to_string(),
    })
}
