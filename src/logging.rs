//! Pipeline logging.
//!
//! One log file per session under a configurable directory, optionally
//! mirrored to stdout. The file is truncated at startup so each log
//! describes exactly one pipeline run. Processor cycles and render jobs
//! open tracing spans, and span-close events carry their durations, so
//! the log doubles as a coarse timing record. `RUST_LOG` overrides the
//! default `info` filter.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Where pipeline log output goes.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Directory the log file lives in; created if missing.
    pub dir: PathBuf,
    /// Log file name within `dir`.
    pub file: String,
    /// Mirror records to stdout. On for standalone CLI runs; off when
    /// the pipeline is embedded in a game server that owns the console.
    pub console: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file: String::from("terratile.log"),
            console: true,
        }
    }
}

impl LogOptions {
    /// Full path of the session log file.
    pub fn log_path(&self) -> PathBuf {
        self.dir.join(&self.file)
    }
}

/// Keeps the non-blocking file writer alive.
///
/// Dropping the guard flushes buffered records and closes the file;
/// hold it for the life of the pipeline.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Install the global subscriber writing to the session log file (and
/// stdout when [`LogOptions::console`] is set).
///
/// Call once at startup. A previous session's file is truncated, not
/// appended to.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or the old
/// log file cannot be cleared.
pub fn init_logging(options: &LogOptions) -> Result<LoggingGuard, io::Error> {
    fs::create_dir_all(&options.dir)?;
    fs::write(options.log_path(), "")?;

    let appender = tracing_appender::rolling::never(&options.dir, &options.file);
    let (file_writer, file_guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE);

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if options.console {
        let stdout_layer = tracing_subscriber::fmt::layer()
            .with_writer(io::stdout)
            .with_span_events(FmtSpan::CLOSE);
        registry.with(stdout_layer).init();
    } else {
        registry.init();
    }

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
