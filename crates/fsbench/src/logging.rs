//! Tracing subscriber setup for the binary.
//!
//! Console output goes through `tracing-indicatif` so log lines appear above
//! progress bars without clobbering them. Each run also gets a plain-text log
//! file at `<log_dir>/<run_id>/benchmark.log`.

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name of the per-run log.
pub const LOG_FILE_NAME: &str = "benchmark.log";

/// Keeps the file writer flushing until dropped.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
    log_file: Option<PathBuf>,
}

impl LoggingGuard {
    /// Path of the per-run log file, if one is being written.
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

/// Console filter: `RUST_LOG` if set, else `info` when verbose, `warn` otherwise.
pub fn console_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "info" } else { "warn" }))
}

/// Install the global subscriber.
///
/// With `run_log_dir` set, the directory is created and every `info` and
/// above event is also appended to its `benchmark.log`.
pub fn init(verbose: bool, run_log_dir: Option<&Path>) -> anyhow::Result<LoggingGuard> {
    let indicatif_layer = IndicatifLayer::new();
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(indicatif_layer.get_stderr_writer())
        .with_filter(console_filter(verbose));

    let (file_layer, file_guard, log_file) = match run_log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer)
                .with_filter(LevelFilter::INFO);
            (Some(layer), Some(guard), Some(dir.join(LOG_FILE_NAME)))
        }
        None => (None, None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(indicatif_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(path) = &log_file {
        tracing::info!(log_file = %path.display(), "logging_initialized");
    }

    Ok(LoggingGuard {
        _file_guard: file_guard,
        log_file,
    })
}
