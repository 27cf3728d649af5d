#![deny(missing_docs)]
//! Shared logging utilities for the pagewatch workspace.
//!
//! This crate provides the `job_*` logging macros used by the scrape engine,
//! the logger initialization used by the binary, and a minimal test
//! initializer for the global logger.

use std::fs::File;
use std::path::PathBuf;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

#[doc(hidden)]
pub use log as __log;

/// Logs a trace-level message prefixed with the job name.
#[macro_export]
macro_rules! job_trace {
    ($job:expr, $($arg:tt)+) => {{
        $crate::__log::trace!("[{}] {}", $job, format_args!($($arg)+));
    }};
}

/// Logs a debug-level message prefixed with the job name.
#[macro_export]
macro_rules! job_debug {
    ($job:expr, $($arg:tt)+) => {{
        $crate::__log::debug!("[{}] {}", $job, format_args!($($arg)+));
    }};
}

/// Logs an info-level message prefixed with the job name.
#[macro_export]
macro_rules! job_info {
    ($job:expr, $($arg:tt)+) => {{
        $crate::__log::info!("[{}] {}", $job, format_args!($($arg)+));
    }};
}

/// Logs a warn-level message prefixed with the job name.
#[macro_export]
macro_rules! job_warn {
    ($job:expr, $($arg:tt)+) => {{
        $crate::__log::warn!("[{}] {}", $job, format_args!($($arg)+));
    }};
}

/// Logs an error-level message prefixed with the job name.
#[macro_export]
macro_rules! job_error {
    ($job:expr, $($arg:tt)+) => {{
        $crate::__log::error!("[{}] {}", $job, format_args!($($arg)+));
    }};
}

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to the configured log file.
    File,
    /// Write to terminal (stdout/stderr).
    Terminal,
    /// Write to both file and terminal.
    Both,
}

/// Settings for the process-wide logger.
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Where log lines go.
    pub destination: LogDestination,
    /// Maximum level that is emitted.
    pub level: LevelFilter,
    /// Log file, used for `File` and `Both`.
    pub file_path: PathBuf,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            destination: LogDestination::Terminal,
            level: LevelFilter::Info,
            file_path: PathBuf::from("./pagewatch.log"),
        }
    }
}

/// Initialize the global logger.
///
/// A log file that cannot be created is reported on stderr and skipped; if
/// no logger remains, logging stays disabled. Calling this twice is a no-op.
pub fn initialize(settings: &LogSettings) {
    let config = build_config();
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    if matches!(
        settings.destination,
        LogDestination::Terminal | LogDestination::Both
    ) {
        loggers.push(TermLogger::new(
            settings.level,
            config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }

    if matches!(
        settings.destination,
        LogDestination::File | LogDestination::Both
    ) {
        if let Some(file_logger) = create_file_logger(settings, config) {
            loggers.push(file_logger);
        }
    }

    if loggers.is_empty() {
        return;
    }
    let _ = CombinedLogger::init(loggers);
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(settings: &LogSettings, config: Config) -> Option<Box<WriteLogger<File>>> {
    match File::create(&settings.file_path) {
        Ok(file) => Some(WriteLogger::new(settings.level, config, file)),
        Err(err) => {
            eprintln!(
                "Warning: Could not create log file at {:?}: {}",
                settings.file_path, err
            );
            None
        }
    }
}
