//! # Logging Utilities
//!
//! Logging infrastructure for vantage hosts using `tracing`.
//!
//! This module provides structured logging with support for:
//! - Pretty (development) or JSON (machine-readable) output
//! - `RUST_LOG` filters, overridable by an explicit level
//! - Optional file output next to the console
//! - File-only output for hosts embedded in a debugger engine, whose
//!   terminal belongs to the engine
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vantage_utils::init_logging;
//!
//! // Reads RUST_LOG, VANTAGE_LOG_FORMAT and VANTAGE_LOG_FILE
//! init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("Host started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Log level filter (e.g., `RUST_LOG=debug`, `RUST_LOG=vantage_core=trace`)
//! - `VANTAGE_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
//! - `VANTAGE_LOG_FILE`: Optional path to a log file, rotated daily
//!
//! ## Embedded Hosts
//!
//! ```rust,no_run
//! use vantage_utils::{LogLevel, init_logging_to_file};
//!
//! // Inside GDB: never write to the engine's console
//! let path = init_logging_to_file(None, Some(LogLevel::Debug)).expect("Failed to initialize logging");
//! tracing::info!(log = %path.display(), "Logging to file");
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use chrono::Local;
use tracing::Level;
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format (default)
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {s}. Use 'pretty' or 'json'")),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "Unknown log level: {s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            )),
        }
    }
}

/// Initialize console logging from the environment
///
/// - `RUST_LOG`: filter (default `info`)
/// - `VANTAGE_LOG_FORMAT`: `pretty` or `json` (default `pretty`)
/// - `VANTAGE_LOG_FILE`: also write to this file, rotated daily
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging() -> Result<(), LoggingError>
{
    let format = env::var("VANTAGE_LOG_FORMAT")
        .ok()
        .and_then(|s| LogFormat::from_str(&s).ok())
        .unwrap_or(LogFormat::Pretty);
    let log_file = env::var("VANTAGE_LOG_FILE").ok().map(PathBuf::from);

    init_console(format, build_filter(None), log_file.as_deref())
}

/// Initialize console logging with an explicit level and format
///
/// `VANTAGE_LOG_FILE` is still honoured.
///
/// ## Example
///
/// ```rust,no_run
/// use vantage_utils::{LogFormat, LogLevel, init_logging_with_level};
///
/// init_logging_with_level(LogLevel::Debug, LogFormat::Pretty).expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<(), LoggingError>
{
    let log_file = env::var("VANTAGE_LOG_FILE").ok().map(PathBuf::from);
    init_console(format, build_filter(Some(level.into())), log_file.as_deref())
}

/// Initialize file-only logging
///
/// Nothing is written to stdout or stderr. The file is
/// `<dir>/YYYY-MM-DD-vantage.log`, where `dir` defaults to `~/.vantage`
/// (or the system temp directory without `HOME`). `level` overrides
/// `RUST_LOG`.
///
/// Returns the path of the log file.
///
/// ## Errors
///
/// Returns an error if the directory can't be created or a global
/// subscriber is already installed.
pub fn init_logging_to_file(dir: Option<&Path>, level: Option<LogLevel>) -> Result<PathBuf, LoggingError>
{
    let today = Local::now().format("%Y-%m-%d").to_string();
    let dir = match dir {
        Some(dir) => dir.to_path_buf(),
        None => default_log_dir(env::var_os("HOME").map(PathBuf::from)),
    };
    std::fs::create_dir_all(&dir).map_err(LoggingError::FileError)?;
    let log_file = dated_log_file(&dir, &today);

    // The date is already in the name, so the file never rotates
    let appender = tracing_appender::rolling::never(&dir, log_file.file_name().unwrap_or_default());
    let writer = keep_alive(tracing_appender::non_blocking(appender));
    let filter = build_filter(level.map(Into::into));

    Registry::default()
        .with(file_layer(LogFormat::Pretty, writer, filter))
        .try_init()
        .map_err(|error| LoggingError::InitializationFailed(error.to_string()))?;
    Ok(log_file)
}

/// Directory used by [`init_logging_to_file`] when none is given.
pub fn default_log_dir(home: Option<PathBuf>) -> PathBuf
{
    match home {
        Some(home) => home.join(".vantage"),
        None => env::temp_dir(),
    }
}

/// `<dir>/<date>-vantage.log`
pub fn dated_log_file(dir: &Path, date: &str) -> PathBuf
{
    dir.join(format!("{date}-vantage.log"))
}

/// Filter priority: explicit level, then `RUST_LOG`, then `info`.
fn build_filter(explicit_level: Option<Level>) -> EnvFilter
{
    match explicit_level {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string())),
    }
}

/// Leak the worker guard: the writer must outlive every subscriber, and the
/// subscriber is global.
fn keep_alive((writer, guard): (NonBlocking, tracing_appender::non_blocking::WorkerGuard)) -> NonBlocking
{
    std::mem::forget(guard);
    writer
}

fn init_console(format: LogFormat, filter: EnvFilter, log_file: Option<&Path>) -> Result<(), LoggingError>
{
    let mut layers: Vec<BoxedLayer> = Vec::new();

    if let Some(path) = log_file {
        let appender = tracing_appender::rolling::daily(
            path.parent().unwrap_or_else(|| Path::new(".")),
            path.file_name().unwrap_or_default(),
        );
        let writer = keep_alive(tracing_appender::non_blocking(appender));
        layers.push(file_layer(format, writer, filter.clone()));
    }
    layers.push(console_layer(format, filter));

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|error| LoggingError::InitializationFailed(error.to_string()))
}

fn console_layer(format: LogFormat, filter: EnvFilter) -> BoxedLayer
{
    // stdout carries command output
    let base = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(io::stderr);

    match format {
        LogFormat::Pretty => base.with_ansi(true).with_filter(filter).boxed(),
        LogFormat::Json => base
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    }
}

fn file_layer(format: LogFormat, writer: NonBlocking, filter: EnvFilter) -> BoxedLayer
{
    let base = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339());

    match format {
        LogFormat::Pretty => base.with_ansi(false).with_filter(filter).boxed(),
        LogFormat::Json => base
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    }
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
