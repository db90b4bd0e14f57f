//! Structured logging setup with console and optional file output.
//!
//! Provides:
//! - Console output, colored only when stdout is a terminal
//! - Daily rotating log files when `SHEETSYNC_LOG_DIR` is set
//! - Console-only fallback when file logging fails
//! - Environment variable override via SHEETSYNC_LOG or RUST_LOG

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Directory for rotating log files.
pub const LOG_DIR_ENV: &str = "SHEETSYNC_LOG_DIR";

/// Log filter override, checked before RUST_LOG.
pub const LOG_FILTER_ENV: &str = "SHEETSYNC_LOG";

/// Logging configuration.
pub struct LogConfig {
    /// Directory for log files, console only when unset
    pub log_dir: Option<PathBuf>,
    /// Whether stdout is a terminal (enables ANSI colors)
    pub is_pty: bool,
    /// Optional custom log filter
    pub log_filter: Option<String>,
}

impl LogConfig {
    /// Create a console-only logging configuration.
    pub fn new() -> Self {
        Self { log_dir: None, is_pty: atty::is(atty::Stream::Stdout), log_filter: None }
    }

    /// Read the log directory from `SHEETSYNC_LOG_DIR`.
    pub fn from_env() -> Self {
        let log_dir = std::env::var_os(LOG_DIR_ENV).filter(|v| !v.is_empty()).map(PathBuf::from);
        Self { log_dir, ..Self::new() }
    }

    /// Also write logs to rotating files in `dir`.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Set custom log filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that must be held for the lifetime of the process.
///
/// Dropping this guard flushes pending log entries.
pub struct LoggingGuard {
    _worker_guard: Option<WorkerGuard>,
}

/// Initialize logging with the given configuration.
///
/// If file logging initialization fails, falls back to console-only.
pub fn init_logging(config: LogConfig) -> LoggingGuard {
    let Some(log_dir) = config.log_dir.as_ref() else {
        return init_stdout_logging(config.log_filter.as_deref(), config.is_pty);
    };

    match init_file_logging(log_dir, &config) {
        Ok(guard) => LoggingGuard { _worker_guard: Some(guard) },
        Err(e) => {
            eprintln!("Warning: Failed to initialize file logging: {}. Using console only.", e);
            init_stdout_logging(config.log_filter.as_deref(), config.is_pty)
        }
    }
}

/// Initialize stdout-only logging.
fn init_stdout_logging(filter: Option<&str>, ansi: bool) -> LoggingGuard {
    let env_filter = build_env_filter(filter);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(ansi)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    LoggingGuard { _worker_guard: None }
}

/// Initialize file + console logging.
fn init_file_logging(
    log_dir: &Path,
    config: &LogConfig,
) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("sheetsync")
        .filename_suffix("log")
        .build(log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Console keeps progress-level output, the file gets everything the filter allows
    let stdout = std::io::stdout.with_max_level(tracing::Level::INFO);
    let combined = stdout.and(non_blocking);

    let env_filter = build_env_filter(config.log_filter.as_deref());

    tracing_subscriber::fmt()
        .with_writer(combined)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    Ok(guard)
}

/// Build the environment filter from config or defaults.
fn build_env_filter(custom_filter: Option<&str>) -> EnvFilter {
    // Priority: custom filter > SHEETSYNC_LOG > RUST_LOG > default
    if let Some(filter) = custom_filter {
        return EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(default_log_filter()));
    }

    EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter()))
}

/// Get the default log filter based on build type.
pub fn default_log_filter() -> &'static str {
    #[cfg(debug_assertions)]
    {
        "info,sheetsync=debug,sheetsync_core=debug,tokio_postgres=warn,hyper=warn,reqwest=warn"
    }
    #[cfg(not(debug_assertions))]
    {
        "info,tokio_postgres=warn,hyper=warn,reqwest=warn"
    }
}
